//! Durable contact memory produced by compaction.

use chrono::NaiveDateTime;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::contact::Contact;

/// A summary of the messages removed by one compaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub contact_id: i64,
    pub summary: String,
    /// Short durable facts, in extraction order.
    pub key_facts: Vec<String>,
    /// Number of raw messages this summary replaces.
    pub message_count: usize,
    pub created_at: NaiveDateTime,
}

impl ConversationSummary {
    /// Timestamped note appended to the contact's notes.
    pub fn note(&self) -> String {
        format!(
            "[{}] {}",
            self.created_at.format("%Y-%m-%d %H:%M"),
            self.summary.trim()
        )
    }
}

/// Append a note to accumulated notes, one note per line.
///
/// Blank notes leave the existing text unchanged.
pub fn append_note(existing: Option<&str>, note: &str) -> Option<String> {
    let note = note.trim();
    match existing.map(str::trim) {
        Some(existing) if !existing.is_empty() && !note.is_empty() => {
            Some(format!("{}\n{}", existing, note))
        }
        Some(existing) if !existing.is_empty() => Some(existing.to_string()),
        _ if !note.is_empty() => Some(note.to_string()),
        _ => None,
    }
}

/// Merge new tags into existing ones, keeping first-seen order.
///
/// Tags are trimmed and compared case-insensitively; blanks are dropped.
pub fn merge_tags(existing: &[String], new: &[String]) -> Vec<String> {
    let mut seen: IndexSet<String> = IndexSet::new();
    let mut merged = Vec::with_capacity(existing.len() + new.len());
    for tag in existing.iter().chain(new.iter()) {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if seen.insert(tag.to_lowercase()) {
            merged.push(tag.to_string());
        }
    }
    merged
}

/// Format a contact's notes and tags into a prompt block.
///
/// Notes are the most valuable part, so the oldest text is dropped first
/// when the block exceeds `max_chars`. Returns `None` when there is nothing
/// to show or `max_chars` is zero.
pub fn format_contact_memory(contact: &Contact, max_chars: usize) -> Option<String> {
    if max_chars == 0 {
        return None;
    }
    let notes = contact
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|notes| !notes.is_empty());
    if notes.is_none() && contact.tags.is_empty() {
        return None;
    }

    let mut sections = Vec::new();
    if !contact.tags.is_empty() {
        sections.push(format!("Datos clave: {}", contact.tags.join(", ")));
    }
    if let Some(notes) = notes {
        let header = "Notas previas:\n";
        let used: usize = sections
            .iter()
            .map(|section| section.chars().count() + 1)
            .sum::<usize>()
            + header.chars().count();
        let budget = max_chars.saturating_sub(used);
        sections.push(format!("{}{}", header, keep_tail(notes, budget)));
    }

    Some(truncate_text(&sections.join("\n"), max_chars))
}

fn keep_tail(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let ellipsis = "...";
    let available = max_chars.saturating_sub(ellipsis.len());
    let tail: String = text.chars().skip(total - available).collect();
    format!("{}{}", ellipsis, tail)
}

/// Truncate to at most `max_chars` characters, ending with `...` when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }

    let total_chars = text.chars().count();
    if total_chars <= max_chars {
        return text.to_string();
    }

    let ellipsis = "...";
    let available = max_chars.saturating_sub(ellipsis.len());
    let mut output: String = text.chars().take(available).collect();
    if output.is_empty() {
        return text.chars().take(max_chars).collect();
    }
    output.push_str(ellipsis);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactKind;
    use chrono::NaiveDate;

    fn contact(notes: Option<&str>, tags: &[&str]) -> Contact {
        Contact {
            id: 7,
            tenant_id: 1,
            kind: ContactKind::Patient,
            phone: "+5215500000000".to_string(),
            name: Some("Luis".to_string()),
            notes: notes.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_append_note() {
        assert_eq!(append_note(None, "  "), None);
        assert_eq!(append_note(None, "Primera"), Some("Primera".to_string()));
        assert_eq!(append_note(Some("Primera"), ""), Some("Primera".to_string()));
        assert_eq!(
            append_note(Some("Primera\n"), "Segunda"),
            Some("Primera\nSegunda".to_string())
        );
    }

    #[test]
    fn test_merge_tags_dedupes_case_insensitively() {
        let existing = vec!["Limpieza".to_string(), "prefiere mañanas".to_string()];
        let new = vec![
            "limpieza".to_string(),
            "  ".to_string(),
            "sensibilidad dental".to_string(),
        ];
        assert_eq!(
            merge_tags(&existing, &new),
            vec!["Limpieza", "prefiere mañanas", "sensibilidad dental"]
        );
    }

    #[test]
    fn test_summary_note_is_timestamped() {
        let summary = ConversationSummary {
            contact_id: 7,
            summary: " Quiere una limpieza. ".to_string(),
            key_facts: vec![],
            message_count: 16,
            created_at: NaiveDate::from_ymd_opt(2026, 3, 2)
                .unwrap()
                .and_hms_opt(10, 15, 0)
                .unwrap(),
        };
        assert_eq!(summary.note(), "[2026-03-02 10:15] Quiere una limpieza.");
    }

    #[test]
    fn test_format_contact_memory_empty() {
        assert!(format_contact_memory(&contact(None, &[]), 500).is_none());
        assert!(format_contact_memory(&contact(Some("  "), &[]), 500).is_none());
        assert!(format_contact_memory(&contact(Some("nota"), &[]), 0).is_none());
    }

    #[test]
    fn test_format_contact_memory_keeps_recent_notes() {
        let notes = format!("{}ÚLTIMA", "x".repeat(400));
        let block = format_contact_memory(&contact(Some(&notes), &["limpieza"]), 120).unwrap();
        assert!(block.chars().count() <= 120);
        assert!(block.starts_with("Datos clave: limpieza"));
        assert!(block.ends_with("ÚLTIMA"));
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hola", 10), "hola");
        assert_eq!(truncate_text("hola mundo", 7), "hola...");
        assert_eq!(truncate_text("hola", 2), "ho");
        assert_eq!(truncate_text("hola", 0), "");
    }
}
