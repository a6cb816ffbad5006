//! # LLM Providers
//!
//! Transport for one structured model call: a system instruction, a user
//! instruction and the tool the model must answer through.
//!
//! - `LlmProvider` is the seam the invoker is generic over
//! - `OpenAIProvider` covers OpenAI and any OpenAI-compatible server
//! - `AnthropicProvider` covers the Messages API

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAIProvider;

use std::collections::HashMap;

// ============================================================================
// Core Types
// ============================================================================

/// The tool a model is forced to call; its input schema is the answer shape
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerTool {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

/// One single-turn completion
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub answer_tool: Option<AnswerTool>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_answer_tool(mut self, tool: AnswerTool) -> Self {
        self.answer_tool = Some(tool);
        self
    }
}

/// What came back from one completion
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub model: String,
    pub content: Option<String>,
    /// Raw JSON arguments of the call to the answer tool, if the model made it
    pub answer: Option<String>,
    /// The model stopped at the output size cap
    pub truncated: bool,
    pub usage: Usage,
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Error type for provider operations
#[derive(Debug)]
pub enum ProviderError {
    /// Network/connection error
    Network(String),
    /// API returned an error
    Api { status: u16, message: String },
    /// Failed to parse response
    Parse(String),
    /// Rate limited
    RateLimited { retry_after: Option<u64> },
    /// Model not found
    ModelNotFound(String),
    /// Authentication failed
    AuthenticationFailed,
    /// Other error
    Other(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "Network error: {}", e),
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::Parse(e) => write!(f, "Parse error: {}", e),
            Self::RateLimited { retry_after } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after {
                    write!(f, " (retry after {}s)", secs)?;
                }
                Ok(())
            }
            Self::ModelNotFound(m) => write!(f, "Model not found: {}", m),
            Self::AuthenticationFailed => write!(f, "Authentication failed"),
            Self::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

/// The main LLM provider trait
#[allow(async_fn_in_trait)]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs and error context
    fn name(&self) -> &str;

    /// Model used when the request names none
    fn default_model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;
}

fn http_client(config: &ProviderConfig) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ProviderError::Other(format!("failed to create HTTP client: {}", e)))
}

/// Map a non-success HTTP response to a [`ProviderError`]
async fn status_error(response: reqwest::Response, model: &str) -> ProviderError {
    match response.status().as_u16() {
        429 => ProviderError::RateLimited {
            retry_after: retry_after(response.headers()),
        },
        401 | 403 => ProviderError::AuthenticationFailed,
        404 => ProviderError::ModelNotFound(model.to_string()),
        status => ProviderError::Api {
            status,
            message: response.text().await.unwrap_or_default(),
        },
    }
}

/// Parse the `retry-after` header of a 429 response, if it carries whole seconds
fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for creating providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_model: String,
    /// HTTP timeout, a backstop behind the per-call `Settings` timeout
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Local,
}

impl ProviderConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::OpenAI,
            api_key: Some(api_key.into()),
            base_url: "https://api.openai.com/v1".into(),
            default_model: "gpt-4o-mini".into(),
            timeout_secs: 120,
        }
    }

    pub fn anthropic(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::Anthropic,
            api_key: Some(api_key.into()),
            base_url: "https://api.anthropic.com/v1".into(),
            default_model: "claude-sonnet-4-20250514".into(),
            timeout_secs: 120,
        }
    }

    /// Any OpenAI-compatible server (vLLM, Ollama, LM Studio)
    pub fn local(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::Local,
            api_key: None,
            base_url: base_url.into(),
            default_model: model.into(),
            timeout_secs: 300,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

// ============================================================================
// Usage Tracking
// ============================================================================

/// Tracks token usage across multiple calls
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    pub total_calls: usize,
    pub total_prompt_tokens: usize,
    pub total_completion_tokens: usize,
    pub by_model: HashMap<String, Usage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, model: &str, usage: &Usage) {
        self.total_calls += 1;
        self.total_prompt_tokens += usage.prompt_tokens;
        self.total_completion_tokens += usage.completion_tokens;

        let entry = self.by_model.entry(model.to_string()).or_default();
        entry.prompt_tokens += usage.prompt_tokens;
        entry.completion_tokens += usage.completion_tokens;
        entry.total_tokens += usage.total_tokens;
    }

    pub fn total_tokens(&self) -> usize {
        self.total_prompt_tokens + self.total_completion_tokens
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_builder() {
        let tool = AnswerTool {
            name: "respond".into(),
            description: "Structured answer".into(),
            schema: serde_json::json!({ "type": "object" }),
        };
        let request = CompletionRequest::new("You are a generator.", "Hello")
            .with_model("gpt-4o-mini")
            .with_temperature(0.7)
            .with_max_tokens(1024)
            .with_answer_tool(tool.clone());

        assert_eq!(request.system, "You are a generator.");
        assert_eq!(request.user, "Hello");
        assert_eq!(request.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(1024));
        assert_eq!(request.answer_tool, Some(tool));
    }

    #[test]
    fn test_provider_config() {
        let config = ProviderConfig::openai("sk-test");
        assert_eq!(config.provider_type, ProviderType::OpenAI);
        assert_eq!(config.default_model, "gpt-4o-mini");

        let config = ProviderConfig::anthropic("sk-ant-test");
        assert_eq!(config.provider_type, ProviderType::Anthropic);

        let config = ProviderConfig::local("http://localhost:11434/v1", "llama3.3")
            .with_base_url("http://gpu-box:8000/v1/");
        assert_eq!(config.api_key, None);
        assert_eq!(config.base_url, "http://gpu-box:8000/v1");
    }

    #[test]
    fn test_usage_tracker() {
        let mut tracker = UsageTracker::new();

        tracker.track("gpt-4o-mini", &Usage {
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
        });

        tracker.track("gpt-4o-mini", &Usage {
            prompt_tokens: 200,
            completion_tokens: 100,
            total_tokens: 300,
        });

        assert_eq!(tracker.total_calls, 2);
        assert_eq!(tracker.total_prompt_tokens, 300);
        assert_eq!(tracker.total_completion_tokens, 150);
        assert_eq!(tracker.total_tokens(), 450);
        assert_eq!(tracker.by_model["gpt-4o-mini"].total_tokens, 450);
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::RateLimited { retry_after: Some(3) };
        assert_eq!(err.to_string(), "Rate limited (retry after 3s)");

        let err = ProviderError::Api { status: 500, message: "boom".into() };
        assert_eq!(err.to_string(), "API error (500): boom");
    }
}
