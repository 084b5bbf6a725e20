//! Rolling summarization of long conversations.
//!
//! Once a contact's transcript grows past the threshold, everything but the
//! most recent tail is summarized into durable notes and tags and the raw
//! messages are deleted. The summary is the only memory of those messages,
//! so nothing is deleted unless the summary was produced and stored.

use std::collections::HashSet;
use std::env;
use std::sync::{Arc, Mutex};

use brain_core::{
    truncate_text, ChatGateway, ChatMessage, ClinicStore, CompletionRequest, ConversationSummary,
    ResponseFormat, Role, StoredMessage,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Compaction runs when the message count exceeds this.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 20;

/// Messages left untouched by a compaction.
pub const DEFAULT_KEEP_RECENT: usize = 5;

/// Most facts kept from one summary.
const MAX_KEY_FACTS: usize = 12;

/// Longest fact kept, in characters.
const MAX_FACT_CHARS: usize = 120;

const SUMMARY_SYSTEM_PROMPT: &str = r#"Resumes conversaciones entre una clínica dental y un paciente o prospecto. El resumen será la ÚNICA memoria que quede de estos mensajes, así que conserva los datos duraderos y descarta saludos, cortesías y relleno.

Prioriza:
- nombre del paciente y cómo prefiere que le llamen
- servicios o tratamientos que le interesan
- preferencias de horario (días, mañanas o tardes)
- molestias o problemas dentales que mencionó
- citas agendadas, canceladas o reagendadas, con fecha y motivo

Responde SOLO con un objeto JSON con esta forma:
{"summary": "resumen breve en español", "key_facts": ["dato corto", "otro dato corto"]}"#;

/// Compaction configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionSettings {
    pub threshold: usize,
    pub keep_recent: usize,
    /// Model override for the summarization call.
    pub model: Option<String>,
}

impl Default for CompactionSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_COMPACTION_THRESHOLD,
            keep_recent: DEFAULT_KEEP_RECENT,
            model: None,
        }
    }
}

impl CompactionSettings {
    /// Settings from the environment.
    ///
    /// - `COMPACTION_THRESHOLD` - message count that must be exceeded (default: 20)
    /// - `COMPACTION_KEEP_RECENT` - messages kept verbatim (default: 5)
    /// - `COMPACTION_MODEL` - model override for summaries
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            threshold: env::var("COMPACTION_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.threshold),
            keep_recent: env::var("COMPACTION_KEEP_RECENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.keep_recent),
            model: env::var("COMPACTION_MODEL")
                .ok()
                .filter(|m| !m.trim().is_empty()),
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_keep_recent(mut self, keep_recent: usize) -> Self {
        self.keep_recent = keep_recent;
        self
    }
}

/// Result of one compaction check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// Below the threshold; nothing to do.
    Skipped { message_count: usize },
    /// The prefix was summarized and deleted.
    Compacted { removed: usize, key_facts: usize },
    /// Something failed; no message was deleted.
    Aborted(String),
    /// Another compaction of the same contact is still running.
    Busy,
}

#[derive(Debug, Deserialize)]
struct SummaryPayload {
    summary: String,
    #[serde(default, alias = "keyFacts", alias = "facts")]
    key_facts: Vec<String>,
}

/// Summarizes and trims a contact's transcript.
#[derive(Clone)]
pub struct ContextCompactor {
    gateway: Arc<dyn ChatGateway>,
    store: Arc<dyn ClinicStore>,
    settings: CompactionSettings,
    /// Contacts with a compaction in progress, shared by clones.
    in_flight: Arc<Mutex<HashSet<i64>>>,
}

/// Releases the contact's in-flight slot when dropped.
struct InFlight {
    contacts: Arc<Mutex<HashSet<i64>>>,
    contact_id: i64,
}

impl InFlight {
    fn acquire(contacts: &Arc<Mutex<HashSet<i64>>>, contact_id: i64) -> Option<Self> {
        let inserted = contacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(contact_id);
        inserted.then(|| Self {
            contacts: contacts.clone(),
            contact_id,
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.contacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.contact_id);
    }
}

impl ContextCompactor {
    pub fn new(gateway: Arc<dyn ChatGateway>, store: Arc<dyn ClinicStore>) -> Self {
        Self::with_settings(gateway, store, CompactionSettings::default())
    }

    pub fn with_settings(
        gateway: Arc<dyn ChatGateway>,
        store: Arc<dyn ClinicStore>,
        settings: CompactionSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            settings,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn settings(&self) -> &CompactionSettings {
        &self.settings
    }

    /// Compact the contact's transcript if it is over the threshold.
    ///
    /// `now` stamps the summary. Failures are logged and reported as
    /// [`CompactionOutcome::Aborted`]; the next check retries. At most one
    /// compaction per contact runs at a time; an overlapping call returns
    /// [`CompactionOutcome::Busy`] without touching the store.
    pub async fn compact(&self, contact_id: i64, now: NaiveDateTime) -> CompactionOutcome {
        let outcome = match InFlight::acquire(&self.in_flight, contact_id) {
            Some(_slot) => self.try_compact(contact_id, now).await,
            None => CompactionOutcome::Busy,
        };
        match &outcome {
            CompactionOutcome::Skipped { message_count } => {
                debug!(contact_id, message_count, "Compaction not needed");
            }
            CompactionOutcome::Compacted { removed, key_facts } => {
                info!(contact_id, removed, key_facts, "Conversation compacted");
            }
            CompactionOutcome::Aborted(reason) => {
                warn!(contact_id, "Compaction aborted, transcript left intact: {}", reason);
            }
            CompactionOutcome::Busy => {
                debug!(contact_id, "Compaction already running");
            }
        }
        outcome
    }

    async fn try_compact(&self, contact_id: i64, now: NaiveDateTime) -> CompactionOutcome {
        let message_count = match self.store.message_count(contact_id).await {
            Ok(count) => count,
            Err(e) => return CompactionOutcome::Aborted(format!("count failed: {}", e)),
        };
        if message_count <= self.settings.threshold {
            return CompactionOutcome::Skipped { message_count };
        }

        let messages = match self.store.messages(contact_id).await {
            Ok(messages) => messages,
            Err(e) => return CompactionOutcome::Aborted(format!("load failed: {}", e)),
        };
        let split = messages.len().saturating_sub(self.settings.keep_recent);
        let prefix = &messages[..split];
        let Some(last) = prefix.last() else {
            return CompactionOutcome::Skipped {
                message_count: messages.len(),
            };
        };

        let mut request = CompletionRequest::new(vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(render_transcript(prefix)),
        ])
        .with_response_format(ResponseFormat::JsonObject);
        if let Some(model) = &self.settings.model {
            request = request.with_model(model.clone());
        }

        let completion = match self.gateway.complete(request).await {
            Ok(completion) => completion,
            Err(e) => return CompactionOutcome::Aborted(format!("summary call failed: {}", e)),
        };
        let payload = match completion.text_content().map(parse_summary) {
            Some(Ok(payload)) => payload,
            Some(Err(e)) => return CompactionOutcome::Aborted(e),
            None => return CompactionOutcome::Aborted("empty summary response".to_string()),
        };

        let summary = ConversationSummary {
            contact_id,
            summary: payload.summary,
            key_facts: payload.key_facts,
            message_count: prefix.len(),
            created_at: now,
        };

        if let Err(e) = self
            .store
            .commit_compaction(&summary, &summary.note(), last.id)
            .await
        {
            return CompactionOutcome::Aborted(format!("commit failed: {}", e));
        }

        CompactionOutcome::Compacted {
            removed: prefix.len(),
            key_facts: summary.key_facts.len(),
        }
    }
}

fn render_transcript(messages: &[StoredMessage]) -> String {
    messages
        .iter()
        .map(|stored| {
            let speaker = match stored.message.role {
                Role::User => "Paciente",
                Role::Assistant => "Clínica",
            };
            match stored.message.created_at {
                Some(at) => format!(
                    "[{}] {}: {}",
                    at.format("%Y-%m-%d %H:%M"),
                    speaker,
                    stored.message.content
                ),
                None => format!("{}: {}", speaker, stored.message.content),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse the model's JSON summary, tolerating a Markdown code fence.
fn parse_summary(raw: &str) -> Result<SummaryPayload, String> {
    let body = strip_code_fence(raw);
    let mut payload: SummaryPayload =
        serde_json::from_str(body).map_err(|e| format!("unparsable summary: {}", e))?;

    payload.summary = payload.summary.trim().to_string();
    if payload.summary.is_empty() {
        return Err("summary is empty".to_string());
    }

    payload.key_facts = payload
        .key_facts
        .iter()
        .map(|fact| fact.trim())
        .filter(|fact| !fact.is_empty())
        .take(MAX_KEY_FACTS)
        .map(|fact| truncate_text(fact, MAX_FACT_CHARS))
        .collect();

    Ok(payload)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::Message;

    #[test]
    fn test_in_flight_slot_is_exclusive_until_dropped() {
        let contacts = Arc::new(Mutex::new(HashSet::new()));
        let slot = InFlight::acquire(&contacts, 7);
        assert!(slot.is_some());
        assert!(InFlight::acquire(&contacts, 7).is_none());
        assert!(InFlight::acquire(&contacts, 8).is_some());

        drop(slot);
        assert!(InFlight::acquire(&contacts, 7).is_some());
    }

    #[test]
    fn test_parse_summary_plain_and_fenced() {
        let plain = parse_summary(r#"{"summary": "Ana quiere limpieza", "key_facts": ["nombre: Ana"]}"#).unwrap();
        assert_eq!(plain.summary, "Ana quiere limpieza");
        assert_eq!(plain.key_facts, vec!["nombre: Ana"]);

        let fenced = parse_summary("```json\n{\"summary\": \"ok\", \"facts\": [\" prefiere tardes \", \"\"]}\n```").unwrap();
        assert_eq!(fenced.summary, "ok");
        assert_eq!(fenced.key_facts, vec!["prefiere tardes"]);
    }

    #[test]
    fn test_parse_summary_rejects() {
        assert!(parse_summary("Ana quiere una limpieza").is_err());
        assert!(parse_summary(r#"{"summary": "   ", "key_facts": []}"#).is_err());
        assert!(parse_summary(r#"{"key_facts": ["x"]}"#).is_err());
    }

    #[test]
    fn test_parse_summary_limits_facts() {
        let facts: Vec<String> = (0..20).map(|i| format!("dato {}", i)).collect();
        let raw = serde_json::json!({"summary": "s", "key_facts": facts}).to_string();
        assert_eq!(parse_summary(&raw).unwrap().key_facts.len(), MAX_KEY_FACTS);
    }

    #[test]
    fn test_render_transcript() {
        let messages = vec![
            StoredMessage {
                id: 1,
                message: Message::user("Hola, soy Ana"),
            },
            StoredMessage {
                id: 2,
                message: Message::assistant("¡Hola Ana!"),
            },
        ];
        assert_eq!(
            render_transcript(&messages),
            "Paciente: Hola, soy Ana\nClínica: ¡Hola Ana!"
        );
    }

    #[test]
    fn test_settings_builders() {
        let settings = CompactionSettings::default()
            .with_threshold(8)
            .with_keep_recent(2);
        assert_eq!(settings.threshold, 8);
        assert_eq!(settings.keep_recent, 2);
        assert_eq!(settings.model, None);
    }
}
