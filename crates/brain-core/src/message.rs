//! Conversation message types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Author of a stored conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A single message in the live transcript.
///
/// Messages are never mutated after creation. They are only appended by the
/// pipeline or deleted by compaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: Option<NaiveDateTime>,
}

impl Message {
    /// Create a user message without a timestamp.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: None,
        }
    }

    /// Create an assistant message without a timestamp.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: None,
        }
    }
}

/// A persisted message together with its storage identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: i64,
    pub message: Message,
}

/// A resolved inbound trigger.
///
/// Channel-specific routing (which clinic a platform number belongs to) has
/// already happened by the time this is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub tenant_id: i64,
    /// Phone number as received; normalized by the pipeline.
    pub phone: String,
    pub text: String,
    /// Display name reported by the messaging platform, if any.
    pub sender_name: Option<String>,
}

impl InboundMessage {
    pub fn new(tenant_id: i64, phone: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tenant_id,
            phone: phone.into(),
            text: text.into(),
            sender_name: None,
        }
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }
}
