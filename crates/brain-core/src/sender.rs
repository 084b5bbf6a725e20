//! Outbound channel interface.

use async_trait::async_trait;
use thiserror::Error;

/// Delivery failure reported by a [`MessageSender`].
#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct SendError(pub String);

/// Pushes a reply to the end user.
///
/// Called once per processed message with the final reply text.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, tenant_id: i64, phone: &str, text: &str) -> Result<(), SendError>;
}
