//! Tool execution contract between the agent loop and the tool layer.
//!
//! A [`ToolRequest`] carries model-produced arguments that have only been
//! parsed as JSON. Schema validation happens inside the executor, and every
//! failure comes back as a [`ToolResult`] with `success: false` so it can be
//! fed to the model as information.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::{ToolCall, ToolDefinition};
use crate::clinic::ClinicConfig;
use crate::contact::Contact;

/// Tool whose successful result renames the working contact.
pub const UPDATE_NAME_TOOL: &str = "update_name";

/// Tool that marks a conversation for human follow-up.
pub const REQUEST_HUMAN_TOOL: &str = "request_human";

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    /// Human-readable outcome, echoed to the model.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    /// Create a successful tool result.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// Create a failed tool result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a data payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// JSON rendering sent back to the model as the tool message content.
    pub fn to_model_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }
}

/// A request to execute a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    /// Originating tool call id.
    pub id: String,
    pub name: String,
    /// Parsed but unvalidated arguments.
    pub arguments: Value,
}

impl ToolRequest {
    /// Parse arguments from a JSON string.
    ///
    /// An empty string is treated as an empty object, which some models
    /// send for parameterless tools.
    pub fn from_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments_json: &str,
    ) -> Result<Self, serde_json::Error> {
        let arguments = if arguments_json.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments_json)?
        };
        Ok(Self {
            id: id.into(),
            name: name.into(),
            arguments,
        })
    }

    /// Build a request from a model tool call.
    pub fn from_tool_call(call: &ToolCall) -> Result<Self, serde_json::Error> {
        Self::from_call(&call.id, &call.function.name, &call.function.arguments)
    }
}

/// One executed tool call, as reported to the caller of the loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub result: ToolResult,
}

/// Execution context handed to every tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolContext {
    /// Working copy of the contact for the current invocation.
    pub contact: Contact,
    pub tenant_id: i64,
    pub clinic: ClinicConfig,
    /// Clinic-local reference time.
    pub now: NaiveDateTime,
}

/// Trait for executing tool calls issued by the model.
///
/// Implementations never return errors: invalid arguments and storage
/// failures are both expressed as an unsuccessful [`ToolResult`].
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool and return the result.
    async fn execute(&self, request: ToolRequest, context: &ToolContext) -> ToolResult;

    /// Definitions advertised to the model.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Names of the tools this executor supports.
    fn supported_tools(&self) -> Vec<String> {
        self.definitions()
            .into_iter()
            .map(|definition| definition.function.name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("Cita agendada").with_data(serde_json::json!({"id": 4}));
        assert!(result.success);
        assert_eq!(result.message, "Cita agendada");
        assert_eq!(result.data.unwrap()["id"], 4);
    }

    #[test]
    fn test_tool_result_error_content() {
        let result = ToolResult::error("Horario no disponible");
        assert!(!result.success);
        let content = result.to_model_content();
        assert!(content.contains("\"success\":false"));
        assert!(!content.contains("data"));
    }

    #[test]
    fn test_tool_request_parsing() {
        let request =
            ToolRequest::from_call("id-1", "update_name", r#"{"name": "Ana"}"#).unwrap();
        assert_eq!(request.name, "update_name");
        assert_eq!(request.arguments["name"], "Ana");
    }

    #[test]
    fn test_tool_request_empty_arguments() {
        let request = ToolRequest::from_call("id-1", "request_human", "").unwrap();
        assert!(request.arguments.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_tool_request_malformed() {
        assert!(ToolRequest::from_call("id-1", "update_name", "{name: Ana").is_err());
    }
}
