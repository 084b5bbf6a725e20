//! Test doubles for the dental clinic agent.
//!
//! This crate provides stand-ins for every external collaborator of the
//! agent core:
//! - [`ScriptedGateway`] - replays queued completions and records requests
//! - [`FailingGateway`] / [`PanickingGateway`] - gateways that never succeed
//! - [`DelayedGateway`] - wraps another gateway with artificial latency
//! - [`InMemoryStore`] - a [`ClinicStore`] kept in memory
//! - [`RecordingSender`] - a [`MessageSender`] that keeps what it was given
//!
//! For production use, see the `deepseek-brain` and `database` crates.
//!
//! # Example
//!
//! ```rust
//! use mock_brain::{ChatGateway, ChatMessage, Completion, CompletionRequest, ScriptedGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_brain::BrainError> {
//!     let gateway = ScriptedGateway::with_responses([Completion::text("¡Hola!")]);
//!
//!     let completion = gateway
//!         .complete(CompletionRequest::new(vec![ChatMessage::user("Hola")]))
//!         .await?;
//!     assert_eq!(completion.text_content(), Some("¡Hola!"));
//!     assert_eq!(gateway.call_count(), 1);
//!     Ok(())
//! }
//! ```

mod delayed;
pub mod fixtures;
mod gateway;
mod sender;
mod store;

// Re-export brain-core types for convenience
pub use brain_core::{
    async_trait, BrainError, ChatGateway, ChatMessage, ClinicStore, Completion, CompletionRequest,
    MessageSender,
};

pub use delayed::DelayedGateway;
pub use gateway::{tool_call, FailingGateway, PanickingGateway, ScriptedGateway};
pub use sender::{RecordingSender, SentMessage};
pub use store::InMemoryStore;
