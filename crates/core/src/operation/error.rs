//! Error types for unit operations.

use std::time::Duration;
use thiserror::Error;

/// Structural errors raised by unit operations and the chain operator.
///
/// A child process exiting non-zero is not an error; it sets the
/// operation's `failed` flag instead.
#[derive(Debug, Error)]
pub enum OperationError {
    /// A required option is missing or invalid.
    #[error("Invalid operation configuration: {reason}")]
    Configuration { reason: String },

    /// The right-hand side of a chain is not awaiting input.
    #[error("Type mismatch: {reason}")]
    TypeMismatch { reason: String },

    /// Execution was attempted before the source placeholder was bound.
    #[error("Curried operation needs more input: {command}")]
    IncompleteBinding { command: String },
}

impl OperationError {
    /// Creates a new configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates a new type mismatch error.
    pub fn type_mismatch(reason: impl Into<String>) -> Self {
        Self::TypeMismatch {
            reason: reason.into(),
        }
    }
}

/// Errors from launching or waiting on an external command.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The program could not be found.
    #[error("Program not found: {program}")]
    ProgramNotFound { program: String },

    /// The command exceeded its deadline and was killed.
    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    /// The worker pool rejected the job.
    #[error("Worker pool error: {0}")]
    Worker(#[from] crate::worker::WorkerError),

    /// I/O error while spawning or waiting.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
