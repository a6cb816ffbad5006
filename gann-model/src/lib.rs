//! # gann-model
//!
//! The model boundary for the gann loop.
//!
//! ## Core Concepts
//! - **Settings**: Temperature, output size cap and timeout for one call
//! - **Shape**: Declarative description of the structured answer expected back
//! - **ModelInvoker**: Request in, shape-validated object (or error) out
//! - **Provider**: Trait-based LLM communication (OpenAI-compatible, Anthropic)

pub mod error;
pub mod invoker;
pub mod provider;
pub mod settings;
pub mod shape;

pub use error::{Error, ErrorKind, Result};
pub use invoker::{
    extract_payload, number_field, string_field, InvokeRequest, InvokeResult, ModelInvoker, ProviderInvoker,
    StructuredOutput, RESPONSE_TOOL,
};
pub use provider::{
    AnswerTool, AnthropicProvider, CompletionRequest, CompletionResponse, LlmProvider,
    OpenAIProvider, ProviderConfig, ProviderError, ProviderType, Usage, UsageTracker,
};
pub use settings::{Settings, SettingsOverride, MAX_TEMPERATURE, MIN_TEMPERATURE};
pub use shape::{Field, FieldKind, Shape};
