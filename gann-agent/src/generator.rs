//! Generator - produces candidate text from an instruction

use gann_model::{
    string_field, InvokeRequest, InvokeResult, ModelInvoker, Settings, SettingsOverride, Shape,
};
use std::sync::Arc;

/// Model used by every agent unless overridden
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const GENERATOR_SYSTEM_PROMPT: &str = "You are a generator. Respond with the requested text only.";

/// Settings applied when a call carries no override
pub const GENERATOR_DEFAULTS: Settings = Settings::new(0.7, 1024, 30_000);

pub(crate) const TEXT_SHAPE: &str = "generated_text";

/// Expected answer: `{text: string}`
pub fn text_shape() -> Shape {
    Shape::new(TEXT_SHAPE).string("text", "The requested text, and nothing else")
}

/// Free-form text generator
pub struct Generator<I> {
    invoker: Arc<I>,
    model: String,
    defaults: Settings,
}

impl<I: ModelInvoker> Generator<I> {
    pub fn new(invoker: Arc<I>) -> Self {
        Self {
            invoker,
            model: DEFAULT_MODEL.to_string(),
            defaults: GENERATOR_DEFAULTS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_defaults(mut self, defaults: Settings) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> Settings {
        self.defaults
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Produce text for `instruction`; fields absent from `overrides` keep
    /// the generator's defaults
    pub async fn run(&self, instruction: &str, overrides: Option<&SettingsOverride>) -> InvokeResult<String> {
        let settings = overrides
            .map(|o| self.defaults.merge(o))
            .unwrap_or(self.defaults);

        let output = self
            .invoker
            .invoke(InvokeRequest {
                model: self.model.clone(),
                system: GENERATOR_SYSTEM_PROMPT.to_string(),
                user: instruction.to_string(),
                settings,
                shape: text_shape(),
            })
            .await?;

        let text = string_field(&output, "text")?;
        tracing::debug!(chars = text.len(), temperature = settings.temperature, "generated text");
        Ok(text)
    }
}
