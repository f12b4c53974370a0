//! Results of pipeline steps.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// The output of a copy or an executed unit operation.
///
/// `failed` is fixed when the artifact is created; nothing clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    output: PathBuf,
    failed: bool,
}

impl Artifact {
    /// An artifact whose output was produced.
    pub fn succeeded(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            failed: false,
        }
    }

    /// An artifact whose output must not be used.
    pub fn failed(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            failed: true,
        }
    }

    pub(crate) fn with_status(output: impl Into<PathBuf>, failed: bool) -> Self {
        Self {
            output: output.into(),
            failed,
        }
    }

    /// Path of the output file.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Whether this step, or any step before it, failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Consumes the artifact, returning the output path.
    pub fn into_output(self) -> PathBuf {
        self.output
    }
}
