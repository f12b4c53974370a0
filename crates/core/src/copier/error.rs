//! Error types for the copier.

use std::path::PathBuf;
use thiserror::Error;

use crate::worker::WorkerError;

/// Errors that can occur while copying into scratch space.
#[derive(Debug, Error)]
pub enum CopyError {
    /// Source path has no file name to reuse for the destination.
    #[error("Source has no file name: {path}")]
    InvalidSource { path: PathBuf },

    /// Source file not found.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Chunk size must be positive.
    #[error("Invalid chunk size: {chunk_size}")]
    InvalidChunkSize { chunk_size: usize },

    /// Reading the source or writing the destination failed.
    #[error("Failed to copy {source_path} to {destination}")]
    Io {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The destination does not match the source after copying.
    #[error("Copy of {path} is {actual} bytes, expected {expected}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// The worker pool rejected or lost a chunk job.
    #[error("Worker pool error: {0}")]
    Worker(#[from] WorkerError),
}

impl CopyError {
    /// Creates an I/O error for a source/destination pair.
    pub fn io(
        source_path: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        error: std::io::Error,
    ) -> Self {
        Self::Io {
            source_path: source_path.into(),
            destination: destination.into(),
            error,
        }
    }
}
