//! # gann-error
//!
//! Unified error handling for the gann workspace.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., SchemaViolation, Timeout)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use gann_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::SchemaViolation, "field 'score' out of range")
//!         .with_operation("invoker::validate")
//!         .with_context("field", "score")
//!         .with_context("value", "11"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, gann_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - No retry classification: every error ends the run that raised it

mod error;
mod kind;

pub use error::Error;
pub use kind::ErrorKind;

/// Result type alias using gann Error
pub type Result<T> = std::result::Result<T, Error>;
