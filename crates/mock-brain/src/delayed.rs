//! Delayed gateway - wraps another gateway with artificial latency.

use std::time::Duration;

use brain_core::{async_trait, BrainError, ChatGateway, Completion, CompletionRequest};
use tokio::time::sleep;

/// A gateway that wraps another gateway and adds artificial delay.
///
/// Useful for testing timeouts and overlapping invocations.
pub struct DelayedGateway<G: ChatGateway> {
    inner: G,
    delay: Duration,
}

impl<G: ChatGateway> DelayedGateway<G> {
    pub fn new(inner: G, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Create a gateway with a delay in milliseconds.
    pub fn with_millis(inner: G, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: ChatGateway> ChatGateway for DelayedGateway<G> {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, BrainError> {
        sleep(self.delay).await;
        self.inner.complete(request).await
    }

    fn name(&self) -> &str {
        "DelayedGateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedGateway;
    use brain_core::ChatMessage;
    use std::time::Instant;

    #[tokio::test]
    async fn test_delayed_gateway() {
        let gateway = DelayedGateway::with_millis(
            ScriptedGateway::repeating(Completion::text("hola")),
            100,
        );

        let start = Instant::now();
        let completion = gateway
            .complete(CompletionRequest::new(vec![ChatMessage::user("hola")]))
            .await
            .unwrap();

        assert_eq!(completion.text_content(), Some("hola"));
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(gateway.inner().call_count(), 1);
        assert_eq!(gateway.name(), "DelayedGateway");
    }
}
