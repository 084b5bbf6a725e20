//! Core types and traits for the dental clinic conversational agent.
//!
//! This crate provides the shared vocabulary used by every other crate in
//! the workspace. It defines:
//!
//! - [`Contact`], [`Message`], [`ConversationContext`] - the per-invocation input bundle
//! - [`ClinicConfig`], [`Service`], [`Appointment`] - read-only clinic data
//! - [`ChatGateway`] - the trait a remote chat-completion client implements
//! - [`ToolExecutor`] - the trait the agent loop uses to run tool calls
//! - [`ClinicStore`] - the tenant-scoped persistence interface
//! - [`MessageSender`] - the outbound channel a reply is delivered through
//! - [`BrainError`] / [`StoreError`] - error types for gateway and storage calls
//!
//! # Example
//!
//! ```rust
//! use brain_core::{async_trait, BrainError, ChatGateway, Completion, CompletionRequest};
//!
//! struct CannedGateway;
//!
//! #[async_trait]
//! impl ChatGateway for CannedGateway {
//!     async fn complete(&self, _request: CompletionRequest) -> Result<Completion, BrainError> {
//!         Ok(Completion::text("¡Hola!"))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "CannedGateway"
//!     }
//! }
//! ```

mod chat;
mod clinic;
mod contact;
mod context;
mod error;
mod history;
mod memory;
mod message;
mod prompt;
mod sender;
mod store;
mod tools;

pub use chat::{
    ChatGateway, ChatMessage, ChatRole, Completion, CompletionRequest, FunctionCall,
    FunctionDefinition, ResponseFormat, ToolCall, ToolChoice, ToolDefinition,
};
pub use clinic::{
    describe_datetime, format_time_12h, weekday_name_es, Appointment, AppointmentStatus,
    CancellationFact, ClinicConfig, DayHours, NewAppointment, Service, WeeklyHours,
};
pub use contact::{normalize_phone, Contact, ContactKind};
pub use context::ConversationContext;
pub use error::BrainError;
pub use history::{history_window, window_messages, DEFAULT_HISTORY_WINDOW};
pub use memory::{
    append_note, format_contact_memory, merge_tags, truncate_text, ConversationSummary,
};
pub use message::{InboundMessage, Message, Role, StoredMessage};
pub use prompt::hash_prompt;
pub use sender::{MessageSender, SendError};
pub use store::{ClinicStore, StoreError};
pub use tools::{
    ToolContext, ToolExecutor, ToolInvocation, ToolRequest, ToolResult, REQUEST_HUMAN_TOOL,
    UPDATE_NAME_TOOL,
};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

/// Timestamp format used for every persisted and rendered date-time.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
