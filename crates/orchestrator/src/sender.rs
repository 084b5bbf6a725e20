//! Message senders that do not need a messaging platform.

use async_trait::async_trait;
use brain_core::{MessageSender, SendError};
use tracing::info;

/// A no-op message sender that discards all messages.
#[derive(Debug, Clone, Default)]
pub struct NoOpSender;

#[async_trait]
impl MessageSender for NoOpSender {
    async fn send(&self, _tenant_id: i64, _phone: &str, _text: &str) -> Result<(), SendError> {
        Ok(())
    }
}

/// A message sender that logs replies instead of delivering them.
///
/// Used by the local console example.
#[derive(Debug, Clone, Default)]
pub struct LoggingSender;

#[async_trait]
impl MessageSender for LoggingSender {
    async fn send(&self, tenant_id: i64, phone: &str, text: &str) -> Result<(), SendError> {
        info!(tenant_id, phone, "[SEND] {}", text);
        Ok(())
    }
}
