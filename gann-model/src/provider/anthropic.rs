//! Anthropic Messages API provider implementation

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// `max_tokens` is mandatory on this API
const DEFAULT_MAX_TOKENS: usize = 4096;

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(&config)?,
            config,
        })
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let api_key = self.config.api_key.as_deref()
            .ok_or(ProviderError::AuthenticationFailed)?;
        let model = request.model.as_deref().unwrap_or(self.default_model());

        // System prompt travels outside the message list
        let api_request = AnthropicRequest {
            model,
            system: &request.system,
            messages: [AnthropicMessage { role: "user", content: &request.user }],
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            tools: request.answer_tool.as_ref().map(|tool| {
                vec![json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.schema,
                })]
            }),
            tool_choice: request.answer_tool.as_ref()
                .map(|tool| json!({ "type": "tool", "name": tool.name })),
        };

        let response = self.client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(status_error(response, model).await);
        }

        let api_response: AnthropicResponse = response.json().await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let wanted = request.answer_tool.as_ref().map(|t| t.name.as_str());
        let mut content = String::new();
        let mut answer = None;

        for block in api_response.content {
            match block {
                ContentBlock::Text { text } => content.push_str(&text),
                ContentBlock::ToolUse { name, input } if Some(name.as_str()) == wanted => {
                    answer = Some(input.to_string());
                }
                ContentBlock::ToolUse { .. } => {}
            }
        }

        let usage = Usage {
            prompt_tokens: api_response.usage.input_tokens,
            completion_tokens: api_response.usage.output_tokens,
            total_tokens: api_response.usage.input_tokens + api_response.usage.output_tokens,
        };

        Ok(CompletionResponse {
            model: api_response.model,
            content: if content.is_empty() { None } else { Some(content) },
            answer,
            truncated: api_response.stop_reason.as_deref() == Some("max_tokens"),
            usage,
        })
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: [AnthropicMessage<'a>; 1],
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: usize,
    output_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AnthropicProvider {
        AnthropicProvider::new(ProviderConfig::anthropic("sk-ant-test").with_base_url(server.uri()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_complete_moves_system_prompt_and_forces_tool() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({
                "system": "You are a generator.",
                "messages": [{ "role": "user", "content": "Tell me a joke" }],
                "max_tokens": DEFAULT_MAX_TOKENS,
                "tool_choice": { "type": "tool", "name": "respond" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "model": "claude-sonnet-4-20250514",
                "content": [{
                    "type": "tool_use",
                    "id": "toolu_1",
                    "name": "respond",
                    "input": { "text": "A joke." }
                }],
                "stop_reason": "tool_use",
                "usage": { "input_tokens": 20, "output_tokens": 8 }
            })))
            .mount(&server)
            .await;

        let request = CompletionRequest::new("You are a generator.", "Tell me a joke").with_answer_tool(
            AnswerTool {
                name: "respond".into(),
                description: "Structured answer".into(),
                schema: json!({ "type": "object" }),
            },
        );

        let response = provider(&server).complete(request).await.unwrap();
        assert_eq!(response.content, None);
        assert!(!response.truncated);
        let value: serde_json::Value = serde_json::from_str(response.answer.as_deref().unwrap()).unwrap();
        assert_eq!(value["text"], "A joke.");
        assert_eq!(response.usage.total_tokens, 28);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_request() {
        let mut config = ProviderConfig::anthropic("unused");
        config.api_key = None;
        let provider = AnthropicProvider::new(config).unwrap();

        let err = provider
            .complete(CompletionRequest::new("system", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete(CompletionRequest::new("system", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed));
    }
}
