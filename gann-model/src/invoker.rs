//! # Model Invoker
//!
//! The single boundary every agent talks to. A request names the model, the
//! system and user instructions, the [`Settings`] and the expected
//! [`Shape`]; the answer is either an object that satisfies the shape or an
//! error. How the object is obtained (which provider, which transport) is
//! the implementor's business.

use crate::error::{missing_payload, provider_error, Error, ErrorKind, Result};
use crate::provider::{AnswerTool, CompletionRequest, CompletionResponse, LlmProvider, UsageTracker};
use crate::settings::Settings;
use crate::shape::Shape;
use serde_json::{Map, Value};
use std::sync::Mutex;

/// Outcome of one model invocation: a validated value or an error
pub type InvokeResult<T> = Result<T>;

/// A shape-validated structured answer
pub type StructuredOutput = Map<String, Value>;

/// Name of the tool the model is forced to call with its answer
pub const RESPONSE_TOOL: &str = "respond";

/// One request across the model boundary
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub settings: Settings,
    pub shape: Shape,
}

/// Something that turns an [`InvokeRequest`] into a structured answer
#[allow(async_fn_in_trait)]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, request: InvokeRequest) -> InvokeResult<StructuredOutput>;
}

/// [`ModelInvoker`] backed by an [`LlmProvider`].
///
/// The shape is sent as the parameters of a forced `respond` tool call. If
/// the provider ignores the tool and answers in text, a JSON object in the
/// text (optionally fenced) is accepted instead. Either way the result is
/// validated against the shape before it is returned.
pub struct ProviderInvoker<P> {
    provider: P,
    usage: Mutex<UsageTracker>,
}

impl<P: LlmProvider> ProviderInvoker<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            usage: Mutex::new(UsageTracker::new()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Snapshot of the token usage accumulated so far
    pub fn usage(&self) -> UsageTracker {
        self.usage.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn build_request(request: &InvokeRequest) -> CompletionRequest {
        CompletionRequest::new(&request.system, &request.user)
            .with_model(&request.model)
            .with_temperature(request.settings.temperature)
            .with_max_tokens(request.settings.max_output_size)
            .with_answer_tool(AnswerTool {
                name: RESPONSE_TOOL.to_string(),
                description: format!("Return the final answer as a '{}' object.", request.shape.name()),
                schema: request.shape.to_json_schema(),
            })
    }
}

impl<P: LlmProvider> ModelInvoker for ProviderInvoker<P> {
    async fn invoke(&self, request: InvokeRequest) -> InvokeResult<StructuredOutput> {
        request
            .settings
            .validate()
            .map_err(|e| e.with_operation("invoker::invoke"))?;

        tracing::debug!(
            provider = self.provider.name(),
            model = %request.model,
            shape = request.shape.name(),
            temperature = request.settings.temperature,
            prompt_chars = request.user.len(),
            "invoking model"
        );

        let completion = Self::build_request(&request);
        let call = self.provider.complete(completion);
        let response = match tokio::time::timeout(request.settings.timeout(), call).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                return Err(provider_error(err)
                    .with_operation("invoker::invoke")
                    .with_context("provider", self.provider.name())
                    .with_context("model", request.model.clone()));
            }
            Err(_) => {
                return Err(Error::timeout(request.settings.timeout_ms)
                    .with_operation("invoker::invoke")
                    .with_context("model", request.model.clone()));
            }
        };

        self.usage
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .track(&response.model, &response.usage);

        let payload = extract_payload(&response).map_err(|e| e.with_operation("invoker::invoke"))?;

        request
            .shape
            .validate(&payload)
            .map_err(|e| e.with_operation("invoker::validate").with_context("shape", request.shape.name()))
    }
}

/// Pull the structured answer out of a completion: the `respond` tool
/// arguments if present, otherwise a JSON object in the text content
pub fn extract_payload(response: &CompletionResponse) -> Result<Value> {
    let truncated = |e: Error| {
        if response.truncated {
            e.with_context("truncated", "output size cap reached")
        } else {
            e
        }
    };

    if let Some(arguments) = &response.answer {
        return serde_json::from_str::<Value>(arguments).map_err(|e| {
            truncated(
                Error::new(ErrorKind::SchemaViolation, format!("tool arguments are not valid JSON: {}", e))
                    .set_source(e),
            )
        });
    }

    let content = response
        .content
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| truncated(missing_payload(response.model.clone())))?;

    serde_json::from_str::<Value>(strip_fences(content)).map_err(|e| {
        truncated(
            Error::new(ErrorKind::SchemaViolation, format!("response is not a JSON object: {}", e))
                .set_source(e),
        )
    })
}

/// Read a string field from a validated answer
pub fn string_field(output: &StructuredOutput, name: &str) -> Result<String> {
    output
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| crate::error::schema_violation(name, format!("missing string field '{}'", name)))
}

/// Read a numeric field from a validated answer
pub fn number_field(output: &StructuredOutput, name: &str) -> Result<f64> {
    output
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| crate::error::schema_violation(name, format!("missing numeric field '{}'", name)))
}

/// Strip a markdown code fence around a JSON answer
fn strip_fences(content: &str) -> &str {
    if content.contains("```json") {
        content
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .unwrap_or(content)
    } else if content.contains("```") {
        content
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .unwrap_or(content)
    } else {
        content.trim()
    }
}
