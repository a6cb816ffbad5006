//! Control loop - Generator → Discriminator → Configurator, round by round
//!
//! Rounds run strictly in sequence and any stage failure ends the run. The
//! loop never prints; progress is reported through an optional callback.

use crate::configurator::{Configurator, SuggestParams, Suggestion};
use crate::discriminator::{Discriminator, ScoringContext, MAX_SCORE, MIN_SCORE};
use crate::generator::Generator;
use crate::history::History;
use gann_model::{Error, ModelInvoker, Result, Settings, SettingsOverride};
use std::fmt;

/// Round budget and stopping threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopConfig {
    pub max_rounds: usize,
    /// A round scoring at least this much ends the run
    pub target_score: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            target_score: 9.0,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(Error::config_invalid("max_rounds must be at least 1")
                .with_operation("loop_config::validate"));
        }
        if !(MIN_SCORE..=MAX_SCORE).contains(&self.target_score) {
            return Err(Error::config_invalid(format!(
                "target_score must be within [{}, {}]",
                MIN_SCORE, MAX_SCORE
            ))
            .with_operation("loop_config::validate")
            .with_context("target_score", self.target_score.to_string()));
        }
        Ok(())
    }
}

/// Optional input documents the generator works from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Documents {
    pub source_text: Option<String>,
    /// Supporting material shown to the generator ahead of the source
    pub reference: Option<String>,
}

impl Documents {
    pub fn is_empty(&self) -> bool {
        self.source_text.is_none() && self.reference.is_none()
    }

    /// Generator prompt: reference, source, then the instruction
    pub fn frame(&self, instruction: &str) -> String {
        if self.is_empty() {
            return instruction.to_string();
        }

        let mut sections = Vec::with_capacity(3);
        if let Some(reference) = &self.reference {
            sections.push(format!("Reference material:\n{}", reference));
        }
        if let Some(source) = &self.source_text {
            sections.push(format!("Source text:\n{}", source));
        }
        sections.push(format!("Instruction:\n{}", instruction));
        sections.join("\n\n---\n")
    }

    pub fn scoring_context(&self, instruction: &str) -> Option<ScoringContext> {
        self.source_text.as_ref().map(|source| ScoringContext {
            instruction: instruction.to_string(),
            source_text: source.clone(),
        })
    }
}

/// The tunable state a round runs with
#[derive(Debug, Clone, PartialEq)]
pub struct RoundState {
    pub instruction: String,
    pub settings: Settings,
}

impl RoundState {
    pub fn new(instruction: impl Into<String>, settings: Settings) -> Self {
        Self {
            instruction: instruction.into(),
            settings,
        }
    }
}

/// Pipeline stage, as reported on failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generator,
    Discriminator,
    Configurator,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Generator => "generator",
            Stage::Discriminator => "discriminator",
            Stage::Configurator => "configurator",
        };
        write!(f, "{}", s)
    }
}

/// Progress notification, rounds numbered from 1
#[derive(Debug, Clone, Copy)]
pub enum RoundEvent<'a> {
    Started { round: usize, state: &'a RoundState },
    Generated { round: usize, text: &'a str },
    Scored { round: usize, score: f64 },
    Suggested { round: usize, label: &'static str, value: &'a str },
}

/// A round that obtained a score
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    pub round: usize,
    pub state: RoundState,
    pub generated_text: String,
    pub score: f64,
    /// State adopted for the following round, if a suggestion was made
    pub next_state: Option<RoundState>,
}

#[derive(Debug)]
pub enum RunOutcome {
    GoalReached { round: usize, score: f64 },
    Exhausted { rounds: usize, best_score: f64 },
    Failed { round: usize, stage: Stage, error: Error },
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::GoalReached { round, score } => {
                write!(f, "goal reached in round {} with score {}", round, score)
            }
            RunOutcome::Exhausted { rounds, best_score } => {
                write!(f, "exhausted after {} rounds, best score {}", rounds, best_score)
            }
            RunOutcome::Failed { round, stage, error } => {
                write!(f, "{} failed in round {}: {}", stage, round, error)
            }
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub rounds: Vec<RoundOutcome>,
}

impl RunReport {
    pub fn best_score(&self) -> Option<f64> {
        self.rounds.iter().map(|r| r.score).reduce(f64::max)
    }
}

type RoundCallback = Box<dyn Fn(&RoundEvent<'_>) + Send + Sync>;

/// Drives the generator, discriminator and configurator for one run at a time
pub struct ControlLoop<I, D, S> {
    generator: Generator<I>,
    discriminator: D,
    configurator: Configurator<I, S>,
    config: LoopConfig,
    documents: Documents,
    on_round: Option<RoundCallback>,
}

impl<I, D, S> ControlLoop<I, D, S>
where
    I: ModelInvoker,
    D: Discriminator,
    S: Suggestion,
{
    pub fn new(
        generator: Generator<I>,
        discriminator: D,
        configurator: Configurator<I, S>,
        config: LoopConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            generator,
            discriminator,
            configurator,
            config,
            documents: Documents::default(),
            on_round: None,
        })
    }

    pub fn with_documents(mut self, documents: Documents) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_round_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RoundEvent<'_>) + Send + Sync + 'static,
    {
        self.on_round = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn configurator(&self) -> &Configurator<I, S> {
        &self.configurator
    }

    pub fn history(&self) -> &History<S> {
        self.configurator.history()
    }

    /// Run up to `max_rounds` rounds starting from `initial`.
    ///
    /// History from a previous run is discarded first.
    pub async fn run(&mut self, initial: RoundState) -> RunReport {
        self.configurator.reset();
        let mut state = initial;
        let mut rounds = Vec::new();

        for round in 1..=self.config.max_rounds {
            tracing::info!(round, temperature = state.settings.temperature, "round started");
            self.emit(RoundEvent::Started { round, state: &state });

            let prompt = self.documents.frame(&state.instruction);
            let overrides = SettingsOverride::from(state.settings);
            let text = match self.generator.run(&prompt, Some(&overrides)).await {
                Ok(text) => text,
                Err(error) => return fail(round, Stage::Generator, error, rounds),
            };
            self.emit(RoundEvent::Generated { round, text: &text });

            let context = self.documents.scoring_context(&state.instruction);
            let score = match self.discriminator.run(&text, context.as_ref()).await {
                Ok(score) => score,
                Err(error) => return fail(round, Stage::Discriminator, error, rounds),
            };
            tracing::info!(round, score, policy = self.discriminator.name(), "round scored");
            self.emit(RoundEvent::Scored { round, score });

            if score >= self.config.target_score {
                self.configurator
                    .record_round(&state.instruction, state.settings, score);
                rounds.push(RoundOutcome {
                    round,
                    state,
                    generated_text: text,
                    score,
                    next_state: None,
                });
                tracing::info!(round, score, "goal reached");
                return RunReport {
                    outcome: RunOutcome::GoalReached { round, score },
                    rounds,
                };
            }

            let params = SuggestParams {
                instruction: &state.instruction,
                settings_used: state.settings,
                score,
                extra_context: self.documents.source_text.as_deref(),
            };
            let suggestion = match self.configurator.suggest_next(params).await {
                Ok(suggestion) => suggestion,
                Err(error) => return fail(round, Stage::Configurator, error, rounds),
            };
            let rendered = suggestion.render();
            self.emit(RoundEvent::Suggested {
                round,
                label: S::LABEL,
                value: &rendered,
            });

            let mut next = state.clone();
            suggestion.apply(&mut next);
            rounds.push(RoundOutcome {
                round,
                state,
                generated_text: text,
                score,
                next_state: Some(next.clone()),
            });
            state = next;
        }

        let best_score = rounds.iter().map(|r| r.score).fold(MIN_SCORE, f64::max);
        tracing::info!(rounds = rounds.len(), best_score, "round budget exhausted");
        RunReport {
            outcome: RunOutcome::Exhausted {
                rounds: rounds.len(),
                best_score,
            },
            rounds,
        }
    }

    fn emit(&self, event: RoundEvent<'_>) {
        if let Some(callback) = &self.on_round {
            callback(&event);
        }
    }
}

fn fail(round: usize, stage: Stage, error: Error, rounds: Vec<RoundOutcome>) -> RunReport {
    tracing::warn!(round, %stage, %error, "run failed");
    RunReport {
        outcome: RunOutcome::Failed { round, stage, error },
        rounds,
    }
}
