//! Conversational agent core for a dental clinic assistant.
//!
//! This crate provides the [`Orchestrator`] type, which turns one inbound
//! text message into one reply, and the components it is built from:
//!
//! - [`SafetyGate`] - escalation keywords that bypass the model entirely
//! - [`build_system_prompt`] - pure prompt construction from the context
//! - [`AgentLoop`] - bounded model/tool cycle with fixed fallback replies
//! - [`ContextCompactor`] - all-or-nothing summarization of old messages
//!
//! # Architecture
//!
//! ```text
//! Inbound message (tenant, phone, text)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ORCHESTRATOR                           │
//! │                                                             │
//! │  1. Take the per-contact lock                               │
//! │         ↓                                                   │
//! │  2. Resolve contact, load context, store user message       │
//! │         ↓                                                   │
//! │  3. Agent loop:                                             │
//! │     • safety gate hit → handoff reply, no model call        │
//! │     • model call → tool calls → results → model call ...    │
//! │     • at most 5 model calls, failures become fallbacks      │
//! │         ↓                                                   │
//! │  4. Store reply, send it                                    │
//! │         ↓                                                   │
//! │  5. Background compaction check                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use database::{Database, SqliteClinicStore};
//! use deepseek_brain::DeepSeekGateway;
//! use orchestrator::{InboundMessage, LoggingSender, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:clinic.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let store = Arc::new(SqliteClinicStore::new(db));
//!     let gateway = Arc::new(DeepSeekGateway::from_env()?);
//!     let orchestrator = Orchestrator::from_env(store, gateway, LoggingSender);
//!
//!     let message = InboundMessage::new(1, "+52 55 1234 5678", "Hola, quiero una limpieza");
//!     let processed = orchestrator.process(message).await?;
//!
//!     println!("Reply: {}", processed.reply.text);
//!     Ok(())
//! }
//! ```

mod agent;
mod compactor;
mod context;
mod error;
mod locks;
mod orchestrator;
mod safety;
mod sender;
mod system_prompt;

// Public exports
pub use agent::{
    AgentLoop, AgentReply, AgentSettings, LoopOutcome, DEFAULT_MAX_ITERATIONS,
    EMPTY_MESSAGE_REPLY, EXHAUSTED_FALLBACK_REPLY, HANDOFF_CALL_ID, HANDOFF_REPLY, TECHNICAL_FALLBACK_REPLY,
};
pub use compactor::{
    CompactionOutcome, CompactionSettings, ContextCompactor, DEFAULT_COMPACTION_THRESHOLD,
    DEFAULT_KEEP_RECENT,
};
pub use context::{clinic_now, load_context};
pub use error::OrchestratorError;
pub use locks::ContactLocks;
pub use orchestrator::{Orchestrator, ProcessedMessage};
pub use safety::{SafetyGate, DEFAULT_ESCALATION_TERMS, DEFAULT_SAFETY_TERMS_FILE};
pub use sender::{LoggingSender, NoOpSender};
pub use system_prompt::{
    build_system_prompt, PromptSettings, CLOSED_DAY, DEFAULT_PERSONA_NAME, IDENTITY_FIRST_RULE,
    NAME_NOT_PROVIDED,
};

// Re-export commonly used types from dependencies
pub use brain_core::{ConversationContext, InboundMessage, MessageSender, ToolInvocation};
