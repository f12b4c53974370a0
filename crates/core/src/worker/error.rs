//! Error types for the worker pool.

use thiserror::Error;

/// Errors that can occur when submitting work to the pool.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The pool was closed before the job acquired a slot.
    #[error("Worker pool is closed")]
    Closed,

    /// The blocking job panicked or was cancelled by the runtime.
    #[error("Blocking job did not complete: {reason}")]
    Panicked { reason: String },
}
