//! Configuration for the DeepSeek gateway.

use brain_core::BrainError;
use std::env;
use std::time::Duration;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "https://api.deepseek.com";

/// Default model name.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Configuration for [`DeepSeekGateway`](crate::DeepSeekGateway).
#[derive(Debug, Clone)]
pub struct DeepSeekConfig {
    /// API base URL (without `/chat/completions`).
    pub api_url: String,

    /// API key for authentication.
    pub api_key: String,

    /// Model name used when a request does not override it.
    pub model: String,

    /// Maximum tokens for response.
    pub max_tokens: Option<u32>,

    /// Temperature for generation (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for DeepSeekConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: Some(1024),
            temperature: Some(0.4),
            timeout: Duration::from_secs(60),
        }
    }
}

impl DeepSeekConfig {
    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `DEEPSEEK_API_KEY` - API key for authentication
    ///
    /// Optional environment variables:
    /// - `DEEPSEEK_API_URL` - API URL (default: https://api.deepseek.com)
    /// - `DEEPSEEK_MODEL` - Model name (default: deepseek-chat)
    /// - `DEEPSEEK_MAX_TOKENS` - Max tokens (default: 1024)
    /// - `DEEPSEEK_TEMPERATURE` - Temperature (default: 0.4)
    /// - `DEEPSEEK_TIMEOUT_SECS` - Request timeout in seconds (default: 60)
    pub fn from_env() -> Result<Self, BrainError> {
        let api_key = env::var("DEEPSEEK_API_KEY")
            .map_err(|_| BrainError::Configuration("DEEPSEEK_API_KEY not set".to_string()))?;

        let api_url = env::var("DEEPSEEK_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let model = env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let max_tokens = env::var("DEEPSEEK_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(1024));

        let temperature = env::var("DEEPSEEK_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(0.4));

        let timeout = env::var("DEEPSEEK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));

        Ok(Self {
            api_url,
            api_key,
            model,
            max_tokens,
            temperature,
            timeout,
        })
    }

    /// Create a new config builder.
    pub fn builder() -> DeepSeekConfigBuilder {
        DeepSeekConfigBuilder::default()
    }

    /// Full chat-completions endpoint URL.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_url.trim_end_matches('/'))
    }
}

/// Builder for DeepSeekConfig.
#[derive(Debug, Default)]
pub struct DeepSeekConfigBuilder {
    config: DeepSeekConfig,
}

impl DeepSeekConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Set the API URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Set the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = Some(tokens);
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = Some(temp);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> DeepSeekConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeepSeekConfig::default();

        assert_eq!(config.api_url, "https://api.deepseek.com");
        assert!(config.api_key.is_empty());
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.max_tokens, Some(1024));
        assert_eq!(config.temperature, Some(0.4));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(
            config.completions_url(),
            "https://api.deepseek.com/chat/completions"
        );
    }

    #[test]
    fn test_builder_all_options() {
        let config = DeepSeekConfig::builder()
            .api_key("my-key")
            .api_url("http://localhost:8080/")
            .model("deepseek-reasoner")
            .max_tokens(512)
            .temperature(0.1)
            .timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.api_key, "my-key");
        assert_eq!(config.model, "deepseek-reasoner");
        assert_eq!(config.max_tokens, Some(512));
        assert_eq!(config.temperature, Some(0.1));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(
            config.completions_url(),
            "http://localhost:8080/chat/completions"
        );
    }

    // Environment-based tests are combined into a single test to avoid
    // race conditions when tests run in parallel (env vars are process-global).
    #[test]
    fn test_from_env_scenarios() {
        use std::sync::Mutex;
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        fn clear_all_deepseek_vars() {
            std::env::remove_var("DEEPSEEK_API_KEY");
            std::env::remove_var("DEEPSEEK_API_URL");
            std::env::remove_var("DEEPSEEK_MODEL");
            std::env::remove_var("DEEPSEEK_MAX_TOKENS");
            std::env::remove_var("DEEPSEEK_TEMPERATURE");
            std::env::remove_var("DEEPSEEK_TIMEOUT_SECS");
        }

        // Scenario 1: Missing API key should error
        clear_all_deepseek_vars();
        match DeepSeekConfig::from_env() {
            Err(BrainError::Configuration(msg)) => assert!(msg.contains("DEEPSEEK_API_KEY")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }

        // Scenario 2: Only API key set, defaults used
        clear_all_deepseek_vars();
        std::env::set_var("DEEPSEEK_API_KEY", "test-env-key");

        let config = DeepSeekConfig::from_env().unwrap();
        assert_eq!(config.api_key, "test-env-key");
        assert_eq!(config.api_url, "https://api.deepseek.com");
        assert_eq!(config.model, "deepseek-chat");
        assert_eq!(config.max_tokens, Some(1024));
        assert_eq!(config.timeout, Duration::from_secs(60));

        // Scenario 3: All vars set
        clear_all_deepseek_vars();
        std::env::set_var("DEEPSEEK_API_KEY", "full-test-key");
        std::env::set_var("DEEPSEEK_API_URL", "https://proxy.example.com/");
        std::env::set_var("DEEPSEEK_MODEL", "deepseek-reasoner");
        std::env::set_var("DEEPSEEK_MAX_TOKENS", "2048");
        std::env::set_var("DEEPSEEK_TEMPERATURE", "0.9");
        std::env::set_var("DEEPSEEK_TIMEOUT_SECS", "15");

        let config = DeepSeekConfig::from_env().unwrap();
        assert_eq!(config.api_url, "https://proxy.example.com");
        assert_eq!(config.model, "deepseek-reasoner");
        assert_eq!(config.max_tokens, Some(2048));
        assert_eq!(config.temperature, Some(0.9));
        assert_eq!(config.timeout, Duration::from_secs(15));

        // Scenario 4: Unparsable numbers fall back to defaults
        clear_all_deepseek_vars();
        std::env::set_var("DEEPSEEK_API_KEY", "test-key");
        std::env::set_var("DEEPSEEK_MAX_TOKENS", "lots");
        std::env::set_var("DEEPSEEK_TIMEOUT_SECS", "-1");

        let config = DeepSeekConfig::from_env().unwrap();
        assert_eq!(config.max_tokens, Some(1024));
        assert_eq!(config.timeout, Duration::from_secs(60));

        // Cleanup
        clear_all_deepseek_vars();
    }
}
