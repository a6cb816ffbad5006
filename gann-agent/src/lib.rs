//! # gann-agent
//!
//! The feedback loop:
//! 1. Generator produces text from the current instruction and settings
//! 2. Discriminator scores that text from 0 to 10
//! 3. Stop if the score reaches the target
//! 4. Otherwise the Configurator reads the run history and suggests the next
//!    temperature (or a rewritten instruction)
//! 5. Repeat until the round budget runs out
//!
//! Any failure ends the run; nothing is retried.

pub mod configurator;
pub mod control;
pub mod discriminator;
pub mod generator;
pub mod history;

#[cfg(test)]
mod testing;

pub use configurator::{
    Configurator, Instruction, InstructionRewriter, SuggestParams, Suggestion, Temperature,
    TemperatureTuner,
};
pub use control::{
    ControlLoop, Documents, LoopConfig, RoundEvent, RoundOutcome, RoundState, RunOutcome, RunReport,
    Stage,
};
pub use discriminator::{
    Discriminator, HumorDiscriminator, RelevanceDiscriminator, ScoringContext, DISCRIMINATOR_SETTINGS,
};
pub use generator::{Generator, DEFAULT_MODEL, GENERATOR_DEFAULTS};
pub use history::{History, HistoryEntry};
