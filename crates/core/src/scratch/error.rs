//! Error types for the scratch module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while acquiring a scratch directory.
///
/// Release never fails from the caller's point of view.
#[derive(Debug, Error)]
pub enum ScratchError {
    /// The scratch root could not be created.
    #[error("Failed to create scratch root: {path}")]
    RootCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scope directory could not be created.
    #[error("Failed to create scratch directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
