//! DeepSeek-based LLM gateway.
//!
//! This crate provides a [`ChatGateway`](brain_core::ChatGateway)
//! implementation that talks to the DeepSeek chat-completions API with
//! function calling.
//!
//! # Features
//!
//! - OpenAI-compatible request/response with tool calls and `tool_choice`
//! - JSON-object response format for structured extraction
//! - Request timeout reported as a network error
//! - Configurable via environment variables
//!
//! # Usage
//!
//! ```rust,no_run
//! use deepseek_brain::{ChatGateway, ChatMessage, CompletionRequest, DeepSeekGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = DeepSeekGateway::from_env()?;
//!     let completion = gateway
//!         .complete(CompletionRequest::new(vec![ChatMessage::user("Hola")]))
//!         .await?;
//!     println!("{:?}", completion.content);
//!     Ok(())
//! }
//! ```

mod api_types;
mod config;
mod gateway;

pub use config::{DeepSeekConfig, DeepSeekConfigBuilder, DEFAULT_API_URL, DEFAULT_MODEL};
pub use gateway::DeepSeekGateway;

// Re-export brain-core types for convenience
pub use brain_core::{
    async_trait, BrainError, ChatGateway, ChatMessage, Completion, CompletionRequest, ToolCall,
    ToolChoice, ToolDefinition,
};
