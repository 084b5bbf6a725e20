//! Outbound senders that record instead of delivering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use brain_core::{async_trait, MessageSender, SendError};

/// A message pushed through a [`RecordingSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub tenant_id: i64,
    pub phone: String,
    pub text: String,
}

/// Keeps every message it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose deliveries fail after being recorded.
    pub fn failing() -> Self {
        let sender = Self::new();
        sender.fail.store(true, Ordering::SeqCst);
        sender
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, tenant_id: i64, phone: &str, text: &str) -> Result<(), SendError> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(SentMessage {
                tenant_id,
                phone: phone.to_string(),
                text: text.to_string(),
            });

        if self.fail.load(Ordering::SeqCst) {
            return Err(SendError("channel unavailable".to_string()));
        }
        Ok(())
    }
}
