//! DJ RT — the runtime: environment construction, the operation catalog,
//! the two-level evaluator, output handling, and the input driver.

pub mod driver;
pub mod env;
pub mod eval;
pub mod lists;
pub mod ops;
pub mod output;

use thiserror::Error;

/// Errors surfaced while building the environment or evaluating entries.
/// Per-entry N/A is not an error and never reaches this type.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid regex \"{pattern}\": {message}")]
    BadRegex { pattern: String, message: String },
    #[error("replace table '{path}' line {line} is not a two-column mapping")]
    BadReplaceTable { path: String, line: usize },
    #[error("restart gate still passes after {bound} re-entries; the script does not converge")]
    RestartBoundExceeded { bound: usize },
    #[error("operation '{op}' received malformed arguments: {detail}")]
    BadArguments { op: String, detail: String },
    #[error("unknown operation '{name}' reached the evaluator")]
    UnknownOperation { name: String },
}
