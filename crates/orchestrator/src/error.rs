//! Error types for orchestrator operations.

use brain_core::{BrainError, SendError, StoreError};
use thiserror::Error;

/// Errors that can occur while handling an inbound message.
///
/// None of these reach the sender of the message: the pipeline turns each
/// one into a fallback reply.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Inbound message could not be handled as given.
    #[error("message skipped: {0}")]
    Skipped(String),

    /// Storage read or write failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Model call failed.
    #[error("brain error: {0}")]
    Brain(#[from] BrainError),

    /// Reply delivery failed.
    #[error("send failed: {0}")]
    SendFailed(#[from] SendError),

    /// Clinic timezone is not a known IANA name.
    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),
}
