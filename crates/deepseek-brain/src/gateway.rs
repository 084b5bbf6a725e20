//! DeepSeek chat-completion client.

use brain_core::{async_trait, BrainError, ChatGateway, Completion, CompletionRequest};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::api_types::{ApiError, ChatCompletionRequest, ChatCompletionResponse};
use crate::config::DeepSeekConfig;

/// A [`ChatGateway`] backed by the DeepSeek API.
///
/// Stateless apart from the HTTP connection pool: every call sends the full
/// message list it is given.
pub struct DeepSeekGateway {
    client: Client,
    config: DeepSeekConfig,
}

impl DeepSeekGateway {
    /// Create a new gateway with the given configuration.
    pub fn new(config: DeepSeekConfig) -> Result<Self, BrainError> {
        if config.api_key.trim().is_empty() {
            return Err(BrainError::Configuration("API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrainError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "DeepSeekGateway initialized with model: {}, timeout: {:?}",
            config.model, config.timeout
        );

        Ok(Self { client, config })
    }

    /// Create a gateway from environment variables.
    ///
    /// See [`DeepSeekConfig::from_env`] for required environment variables.
    pub fn from_env() -> Result<Self, BrainError> {
        Self::new(DeepSeekConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &DeepSeekConfig {
        &self.config
    }

    async fn send(&self, request: &CompletionRequest) -> Result<ChatCompletionResponse, BrainError> {
        let url = self.config.completions_url();
        let model = request.model.as_deref().unwrap_or(&self.config.model);

        let body = ChatCompletionRequest {
            model,
            messages: &request.messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            tools: &request.tools,
            tool_choice: request.tool_choice,
            response_format: request.response_format,
        };

        debug!(
            "Sending request to DeepSeek: model={}, messages={}, tools={}",
            model,
            request.messages.len(),
            request.tools.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BrainError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            // Try to parse as API error
            let message = match serde_json::from_str::<ApiError>(&error_text) {
                Ok(api_error) => api_error.error.describe(),
                Err(_) => error_text,
            };
            warn!("DeepSeek API error ({}): {}", status.as_u16(), message);

            return Err(BrainError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BrainError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl ChatGateway for DeepSeekGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, BrainError> {
        let response = self.send(&request).await?;

        debug!(
            "DeepSeek response: id={}, model={}",
            response.id.as_deref().unwrap_or("none"),
            response.model.as_deref().unwrap_or("unknown")
        );

        if let Some(ref usage) = response.usage {
            debug!(
                "DeepSeek usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BrainError::InvalidResponse("No choices in response".to_string()))?;

        debug!(
            "DeepSeek finish_reason: {}",
            choice.finish_reason.as_deref().unwrap_or("unknown")
        );

        Ok(Completion {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
        })
    }

    fn name(&self) -> &str {
        "DeepSeekGateway"
    }
}
