//! Contact identity types.

use serde::{Deserialize, Serialize};

/// Whether the contact is a registered patient or a prospect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    /// Has a durable appointment history with the clinic.
    Patient,
    /// Pre-conversion prospect.
    Lead,
}

impl ContactKind {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Lead => "lead",
        }
    }

    /// Parse the storage representation. Unknown values resolve to `Lead`.
    pub fn parse(value: &str) -> Self {
        match value {
            "patient" => Self::Patient,
            _ => Self::Lead,
        }
    }
}

/// The party on the other end of the conversation.
///
/// Exactly one contact resolves per phone number per tenant. A missing
/// `name` is a meaningful state: the assistant has not learned it yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub tenant_id: i64,
    pub kind: ContactKind,
    /// Canonical phone: digits with an optional leading `+`.
    pub phone: String,
    pub name: Option<String>,
    /// Accumulated summaries appended by compaction.
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

impl Contact {
    /// Name with surrounding whitespace removed, if one is known.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Whether the contact has been promoted to a patient.
    pub fn is_registered(&self) -> bool {
        self.kind == ContactKind::Patient
    }
}

/// Reduce a phone number to digits, keeping a leading `+` if present.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut phone = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        phone.push('+');
    }
    phone.extend(trimmed.chars().filter(|c| c.is_ascii_digit()));
    phone
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+52 (55) 1234-5678"), "+525512345678");
        assert_eq!(normalize_phone("55 1234 5678"), "5512345678");
        assert_eq!(normalize_phone("  +1-800-555-0100 "), "+18005550100");
        assert_eq!(normalize_phone("52+55"), "5255");
    }

    #[test]
    fn test_display_name_ignores_blank() {
        let mut contact = Contact {
            id: 1,
            tenant_id: 1,
            kind: ContactKind::Lead,
            phone: "+5215512345678".to_string(),
            name: Some("   ".to_string()),
            notes: None,
            tags: Vec::new(),
        };
        assert_eq!(contact.display_name(), None);

        contact.name = Some(" Ana López ".to_string());
        assert_eq!(contact.display_name(), Some("Ana López"));
        assert!(!contact.is_registered());
    }

    #[test]
    fn test_kind_roundtrip() {
        assert_eq!(ContactKind::parse("patient"), ContactKind::Patient);
        assert_eq!(ContactKind::parse("lead"), ContactKind::Lead);
        assert_eq!(ContactKind::parse("other"), ContactKind::Lead);
        assert_eq!(ContactKind::Patient.as_str(), "patient");
    }
}
