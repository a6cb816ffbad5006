//! Configurator - proposes the next tunable value from run history
//!
//! One control contract, parameterized by what is being tuned:
//! [`Temperature`] (numeric setting tuner) or [`Instruction`] (instruction
//! rewriter). The variant is picked by the type the [`Configurator`] is
//! built with.

use crate::control::RoundState;
use crate::generator::DEFAULT_MODEL;
use crate::history::{preview, History, HistoryEntry};
use gann_model::{
    number_field, string_field, InvokeRequest, InvokeResult, ModelInvoker, Result, Settings,
    Shape, StructuredOutput, MAX_TEMPERATURE, MIN_TEMPERATURE,
};
use std::fmt;
use std::sync::Arc;

/// Maximum characters of supporting context included in the prompt
pub const CONTEXT_PREVIEW_CHARS: usize = 2000;

pub(crate) const TEMPERATURE_SHAPE: &str = "temperature_suggestion";
pub(crate) const INSTRUCTION_SHAPE: &str = "instruction_suggestion";

/// A value the configurator can suggest for the next round
pub trait Suggestion: Clone + fmt::Debug + Send + Sync + 'static {
    /// What the value tunes, as shown to the model and in history
    const LABEL: &'static str;

    fn shape() -> Shape;

    fn system_prompt() -> &'static str;

    /// Settings for the configurator's own model call
    fn settings() -> Settings;

    /// Closing question of the user prompt
    fn question() -> &'static str;

    fn from_output(output: &StructuredOutput) -> Result<Self>;

    /// Rendering used in the history block
    fn render(&self) -> String;

    /// Adopt the value into the next round's state
    fn apply(self, state: &mut RoundState);
}

/// Suggested generator temperature, within [0, 2]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature(pub f32);

const TEMPERATURE_SYSTEM_PROMPT: &str = "You are a configurator for a GAN-like setup where the generator produces text according to a prompt and the discriminator scores that text (0–10; 10 = perfect, 0 = very bad).

- The generator produces its output from a given instruction, using an LLM with a given temperature.
- The discriminator scores that output for quality and relevance.
- Your job: given the generator's instruction, the config (especially temperature) that was used, and the score, suggest the temperature the generator should use NEXT so that the next score is likely to be higher.

Consider:
- Lower temperature (e.g. 0.3–0.6) tends to be more focused and consistent; higher (e.g. 0.7–1.2) more creative/random.
- Use history of past runs to spot patterns (e.g. \"when we used 0.9, score dropped; when we used 0.5, score rose\").
- Suggest one number in the range 0 to 2. Be decisive.";

impl Suggestion for Temperature {
    const LABEL: &'static str = "temperature";

    fn shape() -> Shape {
        Shape::new(TEMPERATURE_SHAPE).number(
            "suggestedTemperature",
            "Temperature for the generator's next run",
            Some(MIN_TEMPERATURE as f64),
            Some(MAX_TEMPERATURE as f64),
        )
    }

    fn system_prompt() -> &'static str {
        TEMPERATURE_SYSTEM_PROMPT
    }

    fn settings() -> Settings {
        Settings::new(0.2, 128, 30_000)
    }

    fn question() -> &'static str {
        "What temperature should the generator use for the NEXT run to maximise the score? Reply with a single number between 0 and 2."
    }

    fn from_output(output: &StructuredOutput) -> Result<Self> {
        number_field(output, "suggestedTemperature").map(|t| Temperature(t as f32))
    }

    fn render(&self) -> String {
        self.0.to_string()
    }

    fn apply(self, state: &mut RoundState) {
        state.settings = state.settings.with_temperature(self.0);
    }
}

/// Suggested replacement instruction for the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction(pub String);

const INSTRUCTION_SYSTEM_PROMPT: &str = "You are a configurator for a GAN-like setup where the generator produces text according to a prompt and the discriminator scores that text (0–10; 10 = perfect, 0 = very bad).

- The generator produces its output from a given instruction, using an LLM with a given temperature.
- The discriminator scores that output for quality and relevance.
- Your job: given the generator's instruction, the config that was used, and the score, write the instruction the generator should receive NEXT so that the next score is likely to be higher.

Consider:
- Vague instructions tend to give varied, unfocused output; specific instructions give more focused and consistent output.
- Use history of past runs to spot patterns (e.g. \"when we asked for bullet points, score rose; when we asked for a narrative, score dropped\").
- Keep what worked in high-scoring instructions and change what did not.
- Reply with the full revised instruction only. Be decisive.";

impl Suggestion for Instruction {
    const LABEL: &'static str = "prompt";

    fn shape() -> Shape {
        Shape::new(INSTRUCTION_SHAPE)
            .non_empty_string("suggestedPrompt", "Full instruction for the generator's next run")
    }

    fn system_prompt() -> &'static str {
        INSTRUCTION_SYSTEM_PROMPT
    }

    fn settings() -> Settings {
        Settings::new(0.2, 512, 30_000)
    }

    fn question() -> &'static str {
        "What instruction should the generator receive for the NEXT run to maximise the score? Reply with the complete revised instruction."
    }

    fn from_output(output: &StructuredOutput) -> Result<Self> {
        string_field(output, "suggestedPrompt").map(|p| Instruction(p.trim().to_string()))
    }

    fn render(&self) -> String {
        format!("\"{}\"", preview(&self.0, crate::history::INSTRUCTION_PREVIEW_CHARS))
    }

    fn apply(self, state: &mut RoundState) {
        state.instruction = self.0;
    }
}

/// Inputs to one [`Configurator::suggest_next`] call
#[derive(Debug, Clone, Copy)]
pub struct SuggestParams<'a> {
    pub instruction: &'a str,
    pub settings_used: Settings,
    pub score: f64,
    /// Supporting material (e.g. the source text), truncated in the prompt
    pub extra_context: Option<&'a str>,
}

/// History-driven tuner for one run
pub struct Configurator<I, S> {
    invoker: Arc<I>,
    model: String,
    history: History<S>,
}

/// Numeric-setting tuner
pub type TemperatureTuner<I> = Configurator<I, Temperature>;
/// Instruction rewriter
pub type InstructionRewriter<I> = Configurator<I, Instruction>;

impl<I: ModelInvoker, S: Suggestion> Configurator<I, S> {
    pub fn new(invoker: Arc<I>) -> Self {
        Self {
            invoker,
            model: DEFAULT_MODEL.to_string(),
            history: History::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn history(&self) -> &History<S> {
        &self.history
    }

    /// Drop the history, starting a fresh run
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Record a scored round that needs no suggestion, such as the one that
    /// reached the target. The model is not called.
    pub fn record_round(&mut self, instruction: &str, settings_used: Settings, score: f64) {
        self.history
            .append(HistoryEntry::new(instruction, settings_used, score));
    }

    /// Record the round, then ask the model for the next value.
    ///
    /// The round is appended to history before the model is called, so a
    /// failed call still leaves it there, just without a suggestion.
    pub async fn suggest_next(&mut self, params: SuggestParams<'_>) -> InvokeResult<S> {
        self.history.append(HistoryEntry::new(
            params.instruction,
            params.settings_used,
            params.score,
        ));

        let user = self.user_prompt(&params);
        let output = self
            .invoker
            .invoke(InvokeRequest {
                model: self.model.clone(),
                system: S::system_prompt().to_string(),
                user,
                settings: S::settings(),
                shape: S::shape(),
            })
            .await?;

        let value = S::from_output(&output)?;
        self.history.record_suggestion(value.clone())?;
        tracing::debug!(label = S::LABEL, suggestion = %value.render(), runs = self.history.len(), "configurator suggested");
        Ok(value)
    }

    fn user_prompt(&self, params: &SuggestParams<'_>) -> String {
        let context_block = params
            .extra_context
            .map(|ctx| {
                format!(
                    "\n\nSource context (same text the generator works from):\n{}",
                    preview(ctx, CONTEXT_PREVIEW_CHARS)
                )
            })
            .unwrap_or_default();

        format!(
            "History of runs (most recent last):\n{}\n\n---\nCurrent run we just got the score for: prompt=\"{}\", temperature={}, score={}.{}\n\n---\n{}",
            self.history.render(),
            params.instruction,
            params.settings_used.temperature,
            params.score,
            context_block,
            S::question()
        )
    }
}
