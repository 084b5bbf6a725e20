//! Chat gateways with scripted behavior.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use brain_core::{async_trait, BrainError, ChatGateway, Completion, CompletionRequest, ToolCall};
use serde_json::Value;

/// Build a tool call with JSON arguments.
pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(id, name, arguments.to_string())
}

/// A gateway that replays a queue of responses and records every request.
///
/// When the queue runs dry it returns the repeating response if one was
/// set, otherwise an error.
#[derive(Default)]
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<Completion, BrainError>>>,
    repeat: Option<Completion>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway that answers with `completions` in order.
    pub fn with_responses(completions: impl IntoIterator<Item = Completion>) -> Self {
        let gateway = Self::new();
        for completion in completions {
            gateway.push(completion);
        }
        gateway
    }

    /// Gateway that answers every call with the same completion.
    pub fn repeating(completion: Completion) -> Self {
        Self {
            repeat: Some(completion),
            ..Self::default()
        }
    }

    /// Queue a completion.
    pub fn push(&self, completion: Completion) {
        self.queue().push_back(Ok(completion));
    }

    /// Queue an error.
    pub fn push_error(&self, error: BrainError) {
        self.queue().push_back(Err(error));
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<Completion, BrainError>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ChatGateway for ScriptedGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, BrainError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        match self.queue().pop_front() {
            Some(response) => response,
            None => self.repeat.clone().ok_or_else(|| {
                BrainError::ProcessingFailed("scripted responses exhausted".to_string())
            }),
        }
    }

    fn name(&self) -> &str {
        "ScriptedGateway"
    }
}

/// A gateway whose every call fails.
pub struct FailingGateway {
    status: u16,
    calls: AtomicUsize,
}

impl FailingGateway {
    /// Fail with an HTTP 503.
    pub fn new() -> Self {
        Self::with_status(503)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FailingGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatGateway for FailingGateway {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, BrainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BrainError::Api {
            status: self.status,
            message: "service unavailable".to_string(),
        })
    }

    fn name(&self) -> &str {
        "FailingGateway"
    }
}

/// A gateway that panics, for exercising panic containment.
#[derive(Debug, Default)]
pub struct PanickingGateway;

#[async_trait]
impl ChatGateway for PanickingGateway {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, BrainError> {
        panic!("gateway bug");
    }

    fn name(&self) -> &str {
        "PanickingGateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::ChatMessage;
    use serde_json::json;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::user(text)])
    }

    #[tokio::test]
    async fn test_scripted_in_order_then_exhausted() {
        let gateway = ScriptedGateway::with_responses([
            Completion::tool_calls(vec![tool_call("c1", "get_available_slots", json!({}))]),
            Completion::text("listo"),
        ]);

        assert!(gateway.complete(request("a")).await.unwrap().has_tool_calls());
        assert_eq!(
            gateway.complete(request("b")).await.unwrap().text_content(),
            Some("listo")
        );
        assert!(gateway.complete(request("c")).await.is_err());
        assert_eq!(gateway.call_count(), 3);
        assert_eq!(
            gateway.requests()[1].messages[0].content.as_deref(),
            Some("b")
        );
    }

    #[tokio::test]
    async fn test_repeating() {
        let gateway = ScriptedGateway::repeating(Completion::text("otra vez"));
        for _ in 0..3 {
            assert_eq!(
                gateway.complete(request("x")).await.unwrap().text_content(),
                Some("otra vez")
            );
        }
    }

    #[tokio::test]
    async fn test_failing_gateway() {
        let gateway = FailingGateway::new();
        let err = gateway.complete(request("x")).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(gateway.call_count(), 1);
    }

    #[test]
    fn test_tool_call_arguments_are_json() {
        let call = tool_call("c9", "update_name", json!({"name": "Ana"}));
        assert_eq!(call.function.arguments, r#"{"name":"Ana"}"#);
    }
}
