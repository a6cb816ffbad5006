//! Discriminator - scores candidate text on a 0-10 scale
//!
//! Two policies share the [`Discriminator`] contract:
//! - [`HumorDiscriminator`] judges the text alone
//! - [`RelevanceDiscriminator`] judges the text against the instruction and
//!   source text it was produced from
//!
//! Both run at a near-zero temperature so repeated calls on the same input
//! score the same.

use crate::generator::DEFAULT_MODEL;
use gann_model::{
    number_field, Error, InvokeRequest, InvokeResult, ModelInvoker, Settings, Shape,
};
use std::sync::Arc;

/// Fixed settings for every scoring call
pub const DISCRIMINATOR_SETTINGS: Settings = Settings::new(0.1, 64, 30_000);

/// Lowest possible score
pub const MIN_SCORE: f64 = 0.0;
/// Highest possible score
pub const MAX_SCORE: f64 = 10.0;

pub(crate) const SCORE_SHAPE: &str = "score";

const HUMOR_SYSTEM_PROMPT: &str = "You are a discriminator that rates how funny a piece of text is.

Score from 0 to 10:
- 10 = genuinely hilarious: original, well-timed, lands a real laugh
- 0 = not funny at all: flat, confusing, or not an attempt at humour

Be consistent and critical. Judge only the text you are given. Only output the score. \
Be strict, giving out anything above 8 should mean that the text is really really funny";

const RELEVANCE_SYSTEM_PROMPT: &str = "You are a discriminator that evaluates how well a generator summarized a source text and picked relevant experiences according to a given prompt.

You receive:
1. The original instruction (what the generator was asked to do)
2. The source text that was to be summarized
3. The generator's output

Score from 0 to 10:
- 10 = perfect: output accurately reflects the source, picks the most relevant parts for the instruction, and follows the instruction well
- 0 = very bad: output is inaccurate, misses relevant parts, or ignores the instruction

Be consistent and critical. Consider: coverage of relevant material, accuracy vs source, and relevance to the instruction. \
Only output the score. Be strict, giving out anything above 8 should mean that the output is really really good";

/// Expected answer: `{score: number in [0, 10]}`
pub fn score_shape() -> Shape {
    Shape::new(SCORE_SHAPE).number(
        "score",
        "Score from 0 (very bad) to 10 (perfect)",
        Some(MIN_SCORE),
        Some(MAX_SCORE),
    )
}

/// What the scored text was supposed to do, and what it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringContext {
    pub instruction: String,
    pub source_text: String,
}

/// Scores a piece of text
#[allow(async_fn_in_trait)]
pub trait Discriminator: Send + Sync {
    /// Short policy name for logs
    fn name(&self) -> &'static str;

    async fn run(&self, output: &str, context: Option<&ScoringContext>) -> InvokeResult<f64>;
}

/// Context-free policy: how funny is the text
pub struct HumorDiscriminator<I> {
    invoker: Arc<I>,
    model: String,
}

impl<I: ModelInvoker> HumorDiscriminator<I> {
    pub fn new(invoker: Arc<I>) -> Self {
        Self {
            invoker,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn user_prompt(output: &str) -> String {
        format!("Text to score:\n{}\n\nHow funny is this text (0–10)?", output)
    }
}

impl<I: ModelInvoker> Discriminator for HumorDiscriminator<I> {
    fn name(&self) -> &'static str {
        "humor"
    }

    async fn run(&self, output: &str, _context: Option<&ScoringContext>) -> InvokeResult<f64> {
        score(&*self.invoker, &self.model, HUMOR_SYSTEM_PROMPT, Self::user_prompt(output)).await
    }
}

/// Context-aware policy: how well does the text satisfy its instruction
/// given the source text
pub struct RelevanceDiscriminator<I> {
    invoker: Arc<I>,
    model: String,
}

impl<I: ModelInvoker> RelevanceDiscriminator<I> {
    pub fn new(invoker: Arc<I>) -> Self {
        Self {
            invoker,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Instruction, source text, then output, each delimited
    pub fn user_prompt(output: &str, context: &ScoringContext) -> String {
        format!(
            "Original instruction to the generator:\n{}\n\n---\nSource text that was to be summarised:\n{}\n\n---\nGenerator's output:\n{}\n\n\
             Score how well the generator summarised and picked relevant material according to the instruction (0–10).",
            context.instruction, context.source_text, output
        )
    }
}

impl<I: ModelInvoker> Discriminator for RelevanceDiscriminator<I> {
    fn name(&self) -> &'static str {
        "relevance"
    }

    async fn run(&self, output: &str, context: Option<&ScoringContext>) -> InvokeResult<f64> {
        let context = context.ok_or_else(|| {
            Error::invalid_argument("relevance scoring needs an instruction and source text")
                .with_operation("discriminator::run")
        })?;
        score(&*self.invoker, &self.model, RELEVANCE_SYSTEM_PROMPT, Self::user_prompt(output, context)).await
    }
}

async fn score<I: ModelInvoker>(invoker: &I, model: &str, system: &str, user: String) -> InvokeResult<f64> {
    let output = invoker
        .invoke(InvokeRequest {
            model: model.to_string(),
            system: system.to_string(),
            user,
            settings: DISCRIMINATOR_SETTINGS,
            shape: score_shape(),
        })
        .await?;
    number_field(&output, "score")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedInvoker;
    use gann_model::ErrorKind;

    fn context() -> ScoringContext {
        ScoringContext {
            instruction: "Summarise the CV, highlight Rust".into(),
            source_text: "Ten years of systems programming.".into(),
        }
    }

    #[tokio::test]
    async fn test_humor_scores_text_alone() {
        let invoker = Arc::new(ScriptedInvoker::new().scores(&[6.5]));
        let discriminator = HumorDiscriminator::new(invoker.clone());

        let score = discriminator.run("A pun.", Some(&context())).await.unwrap();
        assert_eq!(score, 6.5);

        let call = &invoker.calls()[0];
        assert_eq!(call.settings, DISCRIMINATOR_SETTINGS);
        assert_eq!(call.system, HUMOR_SYSTEM_PROMPT);
        assert!(call.user.contains("A pun."));
        assert!(!call.user.contains("systems programming"));
    }

    #[tokio::test]
    async fn test_relevance_prompt_orders_sections() {
        let invoker = Arc::new(ScriptedInvoker::new().scores(&[7.0]));
        let discriminator = RelevanceDiscriminator::new(invoker.clone());

        discriminator.run("Rust expert.", Some(&context())).await.unwrap();

        let user = &invoker.calls()[0].user;
        let instruction = user.find("Summarise the CV").unwrap();
        let source = user.find("Ten years of systems programming.").unwrap();
        let output = user.find("Rust expert.").unwrap();
        assert!(instruction < source && source < output);
        assert_eq!(user.matches("\n---\n").count(), 2);
    }

    #[test]
    fn test_relevance_prompt_is_reproducible() {
        let a = RelevanceDiscriminator::<ScriptedInvoker>::user_prompt("out", &context());
        let b = RelevanceDiscriminator::<ScriptedInvoker>::user_prompt("out", &context());
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_relevance_requires_context() {
        let invoker = Arc::new(ScriptedInvoker::new().scores(&[7.0]));
        let discriminator = RelevanceDiscriminator::new(invoker.clone());

        let err = discriminator.run("Rust expert.", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_rejected() {
        let invoker = Arc::new(ScriptedInvoker::new().scores(&[11.0]));
        let err = HumorDiscriminator::new(invoker).run("A pun.", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    }

    #[tokio::test]
    async fn test_invoker_failure_propagates() {
        let invoker = Arc::new(
            ScriptedInvoker::new().fail(SCORE_SHAPE, Error::inference_failed("provider down")),
        );
        let err = HumorDiscriminator::new(invoker).run("A pun.", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);
        assert_eq!(err.message(), "provider down");
    }
}
