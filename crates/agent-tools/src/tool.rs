//! Tool trait definition and types.

use async_trait::async_trait;
use brain_core::{ToolContext, ToolDefinition, ToolResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ToolError;

/// Raw arguments supplied by the model for one tool call.
///
/// The model is untrusted, so the only way to read the arguments is to
/// deserialize them into the tool's own argument struct with [`ToolArgs::parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArgs {
    value: Value,
}

impl ToolArgs {
    /// Wrap a parsed JSON argument object.
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Deserialize into a typed argument struct.
    ///
    /// Argument structs use `#[serde(deny_unknown_fields)]`, so missing,
    /// mistyped and unexpected keys all fail here.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        // `null` is what some models send for "no arguments".
        let value = if self.value.is_null() {
            Value::Object(Default::default())
        } else {
            self.value.clone()
        };
        serde_json::from_value(value).map_err(|e| ToolError::InvalidArguments(e.to_string()))
    }

    /// The raw JSON value.
    pub fn raw(&self) -> &Value {
        &self.value
    }
}

impl From<Value> for ToolArgs {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Trait for tools the model can call.
///
/// A tool publishes a JSON schema for its arguments and performs its side
/// effect against the clinic store. Out-of-policy requests are reported as
/// [`ToolError`] and turned into an unsuccessful [`ToolResult`] by the
/// executor.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's unique name (used for dispatch).
    fn name(&self) -> &str;

    /// One-line description shown to the model.
    fn description(&self) -> &str;

    /// JSON schema of the argument object.
    fn parameters(&self) -> Value;

    /// Definition advertised to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), self.parameters())
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: ToolArgs, context: &ToolContext)
        -> Result<ToolResult, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct NameArgs {
        name: String,
        #[serde(default)]
        nickname: Option<String>,
    }

    #[test]
    fn test_parse_valid() {
        let args = ToolArgs::new(json!({"name": "Ana"}));
        let parsed: NameArgs = args.parse().unwrap();
        assert_eq!(parsed.name, "Ana");
        assert!(parsed.nickname.is_none());
    }

    #[test]
    fn test_parse_rejects_unknown_field() {
        let args = ToolArgs::new(json!({"name": "Ana", "admin": true}));
        let err = args.parse::<NameArgs>().unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(ref msg) if msg.contains("admin")));
    }

    #[test]
    fn test_parse_rejects_wrong_type() {
        let args = ToolArgs::new(json!({"name": 42}));
        assert!(matches!(
            args.parse::<NameArgs>(),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_parse_missing_field() {
        let args = ToolArgs::new(Value::Null);
        let err = args.parse::<NameArgs>().unwrap_err();
        assert!(err.to_string().contains("name"));
    }
}
