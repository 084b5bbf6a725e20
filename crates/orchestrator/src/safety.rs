//! Escalation keyword gate.
//!
//! Runs before any model call. A hit hands the conversation to a human
//! without spending a model request.

use std::env;
use std::path::Path;

use tracing::info;

/// Default escalation terms file path.
pub const DEFAULT_SAFETY_TERMS_FILE: &str = "ESCALATION_TERMS.txt";

/// Embedded escalation terms: emergencies, bleeding or accidents, and
/// explicit requests for a person.
pub const DEFAULT_ESCALATION_TERMS: &[&str] = &[
    "emergencia",
    "urgencia",
    "urgente",
    "sangrado",
    "sangra",
    "hemorragia",
    "accidente",
    "me caí",
    "me golpeé",
    "se me cayó un diente",
    "diente roto",
    "hinchazón",
    "cara hinchada",
    "fiebre",
    "no puedo respirar",
    "dolor insoportable",
    "hablar con una persona",
    "hablar con alguien",
    "hablar con un humano",
    "persona real",
    "humano",
    "recepcionista",
    "queja",
];

/// Decides whether a message must skip the model and go to a person.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    terms: Vec<String>,
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::new(DEFAULT_ESCALATION_TERMS.iter().copied())
    }
}

impl SafetyGate {
    /// Gate over the given terms. Blank terms are dropped.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|term| term.as_ref().trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();
        Self { terms }
    }

    /// Load the escalation terms.
    ///
    /// Priority:
    /// 1. `SAFETY_TERMS` env var, comma separated (if set and non-empty)
    /// 2. Terms file (`SAFETY_TERMS_FILE` or default `ESCALATION_TERMS.txt`), one per line
    /// 3. Embedded default terms
    pub fn from_env() -> Self {
        // 1. Check for inline env var
        if let Ok(inline) = env::var("SAFETY_TERMS") {
            let gate = Self::new(inline.split(','));
            if !gate.is_empty() {
                info!("Using {} escalation terms from SAFETY_TERMS", gate.len());
                return gate;
            }
        }

        // 2. Try to load from file
        let terms_file = env::var("SAFETY_TERMS_FILE")
            .unwrap_or_else(|_| DEFAULT_SAFETY_TERMS_FILE.to_string());

        if let Some(gate) = Self::from_file(&terms_file) {
            info!("Loaded {} escalation terms from {}", gate.len(), terms_file);
            return gate;
        }

        // 3. Fall back to embedded defaults
        info!("Using embedded escalation terms");
        Self::default()
    }

    /// Load terms from a file, one per line. `#` starts a comment line.
    ///
    /// Returns `None` if the file is missing, unreadable, or has no terms.
    pub fn from_file(path: impl AsRef<Path>) -> Option<Self> {
        let content = std::fs::read_to_string(path.as_ref()).ok()?;
        let gate = Self::new(
            content
                .lines()
                .filter(|line| !line.trim_start().starts_with('#')),
        );
        if gate.is_empty() {
            None
        } else {
            Some(gate)
        }
    }

    /// True if the utterance contains any escalation term, ignoring case.
    pub fn requires_handoff(&self, text: &str) -> bool {
        self.matched_term(text).is_some()
    }

    /// The first escalation term found in `text`.
    pub fn matched_term(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.terms
            .iter()
            .find(|term| text.contains(term.as_str()))
            .map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
