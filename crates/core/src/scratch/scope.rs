//! Scratch scope implementation.

use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::ScratchError;
use crate::metrics::{SCRATCH_CLEANUP_FAILURES, SCRATCH_SCOPES};

/// Prefix used when the caller has no naming hint.
pub const DEFAULT_PREFIX: &str = "mgd";

/// A handle to a scratch directory.
///
/// Copies and unit operations place their outputs under it. The handle does
/// not own the directory; the [`ScratchScope`] it came from does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeDir {
    path: PathBuf,
}

impl ScopeDir {
    /// Absolute path of the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Joins a relative name onto the directory.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Whether `path` lives under this directory.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.path)
    }
}

impl AsRef<Path> for ScopeDir {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// One scratch directory on disk, removed when the scope ends.
#[derive(Debug)]
pub struct ScratchScope {
    dir: ScopeDir,
    prefix: String,
    suffix: String,
    released: bool,
}

impl ScratchScope {
    /// Creates a uniquely named directory under `root`.
    ///
    /// The name is `{prefix}{uuid}{suffix}`. `root` is created if missing.
    pub async fn acquire(root: &Path, prefix: &str, suffix: &str) -> Result<Self, ScratchError> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|source| ScratchError::RootCreationFailed {
                path: root.to_path_buf(),
                source,
            })?;
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|source| ScratchError::RootCreationFailed {
                path: root.to_path_buf(),
                source,
            })?;

        let name = format!("{}{}{}", prefix, Uuid::new_v4().simple(), suffix);
        let path = root.join(name);

        // create_dir (not create_dir_all) so an existing directory is an error.
        tokio::fs::create_dir(&path)
            .await
            .map_err(|source| ScratchError::DirectoryCreationFailed {
                path: path.clone(),
                source,
            })?;

        SCRATCH_SCOPES.with_label_values(&["created"]).inc();
        info!(path = %path.display(), "Acquired scratch scope");

        Ok(Self {
            dir: ScopeDir { path },
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            released: false,
        })
    }

    /// Acquires a scope, runs `body` inside it, and releases it on every exit path.
    ///
    /// The body's result is returned unchanged. If the body panics, the
    /// directory is still removed while unwinding.
    pub async fn scoped<F, Fut, T, E>(
        root: &Path,
        prefix: &str,
        suffix: &str,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce(ScopeDir) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ScratchError>,
    {
        let scope = Self::acquire(root, prefix, suffix).await?;
        let result = body(scope.dir()).await;
        scope.release().await;
        result
    }

    /// Returns a handle to the directory.
    pub fn dir(&self) -> ScopeDir {
        self.dir.clone()
    }

    /// Absolute path of the directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Naming prefix supplied at acquisition.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Naming suffix supplied at acquisition.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Recursively removes the directory.
    ///
    /// Failures (already removed, permission denied) are logged only.
    pub async fn release(mut self) {
        self.released = true;
        let result = tokio::fs::remove_dir_all(self.dir.path()).await;
        Self::report_release(self.dir.path(), result);
    }

    fn report_release(path: &Path, result: std::io::Result<()>) {
        match result {
            Ok(()) => {
                SCRATCH_SCOPES.with_label_values(&["released"]).inc();
                debug!(path = %path.display(), "Released scratch scope");
            }
            Err(e) => {
                SCRATCH_CLEANUP_FAILURES.inc();
                warn!(path = %path.display(), error = %e, "Failed to remove scratch scope");
            }
        }
    }
}

impl Drop for ScratchScope {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let result = std::fs::remove_dir_all(self.dir.path());
        Self::report_release(self.dir.path(), result);
    }
}
