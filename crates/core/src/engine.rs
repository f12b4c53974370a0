//! Top-level orchestrator.
//!
//! An [`Engine`] owns the worker pool and the command runner and hands them
//! to scopes, copies and operations. Independent pipelines share nothing
//! but the engine, so they can run concurrently on cloned handles.
//!
//! # Example
//!
//! ```ignore
//! use rasterchain_core::{Engine, EngineConfig, OperationOptions, Pipeline};
//!
//! let engine = Engine::new(EngineConfig::default());
//!
//! let failed = engine
//!     .with_copied_file(Path::new("input.tif"), |dir, copied| {
//!         let engine = engine.clone();
//!         async move {
//!             let to_byte = engine.gdal_translate(&dir, OperationOptions::new().with("ot", "Byte").with("of", "GTiff"))?;
//!             let result = Pipeline::new(copied).then(to_byte).run().await?;
//!             Ok::<_, EngineError>(result.failed())
//!         }
//!     })
//!     .await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::artifact::Artifact;
use crate::config::EngineConfig;
use crate::copier::{self, CopyError};
use crate::operation::{
    CommandRunner, CommandTemplate, OperationError, OperationOptions, ProcessRunner, UnitOperation,
};
use crate::scratch::{ScopeDir, ScratchError, ScratchScope};
use crate::worker::WorkerPool;

/// Prefix of scopes created for copies.
pub const COPY_SCOPE_PREFIX: &str = "cpy";

/// Prefix of scopes created for operation outputs.
pub const OPERATION_SCOPE_PREFIX: &str = "gunit";

/// Any structural failure surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Scratch(#[from] ScratchError),

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// Owns the shared worker pool and runner.
#[derive(Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    pool: WorkerPool,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("pool", &self.pool)
            .field("runner", &self.runner.name())
            .finish()
    }
}

impl Engine {
    /// Creates an engine that runs commands as child processes.
    pub fn new(config: EngineConfig) -> Self {
        let pool = WorkerPool::new("engine", config.workers.max_concurrent);
        let mut runner = ProcessRunner::new(pool.clone())
            .with_captured_stderr(config.execution.capture_stderr);
        if let Some(timeout) = config.execution.timeout() {
            runner = runner.with_timeout(timeout);
        }
        Self {
            config: Arc::new(config),
            pool,
            runner: Arc::new(runner),
        }
    }

    /// Creates an engine with a custom runner.
    pub fn with_runner(config: EngineConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let pool = WorkerPool::new("engine", config.workers.max_concurrent);
        Self {
            config: Arc::new(config),
            pool,
            runner,
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shared worker pool.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// The shared command runner.
    pub fn runner(&self) -> Arc<dyn CommandRunner> {
        Arc::clone(&self.runner)
    }

    /// Acquires a scope under the configured scratch root.
    pub async fn acquire_scope(&self, prefix: &str, suffix: &str) -> Result<ScratchScope, ScratchError> {
        ScratchScope::acquire(&self.config.scratch.root, prefix, suffix).await
    }

    /// Acquires a scope named with the configured prefix and suffix.
    pub async fn acquire_default_scope(&self) -> Result<ScratchScope, ScratchError> {
        let scratch = &self.config.scratch;
        ScratchScope::acquire(&scratch.root, &scratch.prefix, &scratch.suffix).await
    }

    /// Runs `body` inside a scope named with the configured prefix and suffix.
    pub async fn with_scratch<F, Fut, T, E>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(ScopeDir) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ScratchError>,
    {
        let scratch = &self.config.scratch;
        self.scoped(&scratch.prefix, &scratch.suffix, body).await
    }

    /// Runs `body` inside a fresh scope that is released on every exit path.
    pub async fn scoped<F, Fut, T, E>(&self, prefix: &str, suffix: &str, body: F) -> Result<T, E>
    where
        F: FnOnce(ScopeDir) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ScratchError>,
    {
        ScratchScope::scoped(&self.config.scratch.root, prefix, suffix, body).await
    }

    /// Copies `source` into `dir` using the configured chunk size.
    pub async fn copy_into(&self, dir: &ScopeDir, source: &Path) -> Result<Artifact, CopyError> {
        copier::copy_into(&self.pool, dir, source, self.config.copy.chunk_size).await
    }

    /// Copies `source` into its own scope and runs `body` with the copy.
    ///
    /// The scope, and with it the copy, is removed when `body` returns.
    pub async fn with_copied_file<F, Fut, T, E>(&self, source: &Path, body: F) -> Result<T, E>
    where
        F: FnOnce(ScopeDir, Artifact) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ScratchError> + From<CopyError>,
    {
        let suffix = self.config.scratch.suffix.clone();
        self.scoped(COPY_SCOPE_PREFIX, &suffix, |dir| async move {
            let artifact = self.copy_into(&dir, source).await?;
            body(dir, artifact).await
        })
        .await
    }

    /// Creates a curried operation whose output lives in `dir`.
    pub fn operation(
        &self,
        dir: &ScopeDir,
        command: &str,
        options: OperationOptions,
    ) -> Result<UnitOperation, OperationError> {
        UnitOperation::curried(dir, command, options, self.runner())
    }

    /// Creates a curried `gdal_translate` operation.
    ///
    /// Without `dst`, the output format option `of` is required so the tool
    /// knows what to write.
    pub fn gdal_translate(
        &self,
        dir: &ScopeDir,
        options: OperationOptions,
    ) -> Result<UnitOperation, OperationError> {
        // The configured value is a path, not a command line.
        let template = CommandTemplate::new(self.config.tools.gdal_translate.as_str());
        UnitOperation::curried_from_template(dir, template, options, self.runner())
    }

    /// Creates a curried operation in its own scope and runs `body` with it.
    ///
    /// The operation's output directory is removed when `body` returns, so
    /// anything worth keeping must be copied out first.
    pub async fn with_operation<F, Fut, T, E>(
        &self,
        command: &str,
        options: OperationOptions,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce(UnitOperation) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ScratchError> + From<OperationError>,
    {
        let suffix = self.config.scratch.suffix.clone();
        self.scoped(OPERATION_SCOPE_PREFIX, &suffix, |dir| async move {
            let op = self.operation(&dir, command, options)?;
            body(op).await
        })
        .await
    }

    /// [`Engine::with_operation`] for the configured `gdal_translate`.
    pub async fn with_gdal_translate<F, Fut, T, E>(
        &self,
        options: OperationOptions,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce(UnitOperation) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ScratchError> + From<OperationError>,
    {
        let suffix = self.config.scratch.suffix.clone();
        self.scoped(OPERATION_SCOPE_PREFIX, &suffix, |dir| async move {
            let op = self.gdal_translate(&dir, options)?;
            body(op).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockRunner};
    use tempfile::TempDir;

    fn engine(root: &TempDir, runner: Arc<MockRunner>) -> Engine {
        let mut config = EngineConfig::default();
        config.scratch.root = root.path().to_path_buf();
        Engine::with_runner(config, runner)
    }

    #[tokio::test]
    async fn test_with_copied_file_cleans_up() {
        let sources = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let source = fixtures::raster_fixture(sources.path());
        let engine = engine(&root, Arc::new(MockRunner::new()));

        let copied = engine
            .with_copied_file(&source, |dir, artifact| async move {
                assert!(dir.contains(artifact.output()));
                assert_eq!(std::fs::metadata(artifact.output()).unwrap().len(), 1024);
                Ok::<_, EngineError>(artifact)
            })
            .await
            .unwrap();

        assert!(!copied.output().exists());
        let scope_name = copied.output().parent().unwrap().file_name().unwrap();
        assert!(scope_name.to_string_lossy().starts_with(COPY_SCOPE_PREFIX));
    }

    #[tokio::test]
    async fn test_with_copied_file_missing_source() {
        let root = TempDir::new().unwrap();
        let engine = engine(&root, Arc::new(MockRunner::new()));

        let result = engine
            .with_copied_file(Path::new("/nonexistent/input.tif"), |_, _| async move {
                Ok::<_, EngineError>(())
            })
            .await;
        assert!(matches!(
            result,
            Err(EngineError::Copy(CopyError::SourceNotFound { .. }))
        ));
        // The scope was still released.
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_gdal_translate_uses_configured_tool() {
        let root = TempDir::new().unwrap();
        let runner = Arc::new(MockRunner::new());
        let mut config = EngineConfig::default();
        config.scratch.root = root.path().to_path_buf();
        config.tools.gdal_translate = "/opt/gdal/bin/gdal_translate".to_string();
        let engine = Engine::with_runner(config, runner.clone());

        let scope = engine.acquire_scope(OPERATION_SCOPE_PREFIX, "").await.unwrap();
        let op = engine
            .gdal_translate(&scope.dir(), OperationOptions::new().with("of", "GTiff"))
            .unwrap();
        assert_eq!(op.template().program(), "/opt/gdal/bin/gdal_translate");

        op.bind(&Artifact::succeeded(scope.path().join("in.tif")))
            .await
            .unwrap();
        assert_eq!(
            runner.programs().await,
            vec!["/opt/gdal/bin/gdal_translate"]
        );
    }

    #[tokio::test]
    async fn test_default_scope_uses_configured_prefix() {
        let root = TempDir::new().unwrap();
        let mut config = EngineConfig::default();
        config.scratch.root = root.path().to_path_buf();
        config.scratch.prefix = "job".to_string();
        config.scratch.suffix = ".tmp".to_string();
        let engine = Engine::with_runner(config, Arc::new(MockRunner::new()));

        let scope = engine.acquire_default_scope().await.unwrap();
        let name = scope.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("job"));
        assert!(name.ends_with(".tmp"));
        scope.release().await;

        let path = engine
            .with_scratch(|dir| async move { Ok::<_, EngineError>(dir.path().to_path_buf()) })
            .await
            .unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("job"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_default_prefix_is_mgd() {
        let root = TempDir::new().unwrap();
        let engine = engine(&root, Arc::new(MockRunner::new()));
        let scope = engine.acquire_default_scope().await.unwrap();
        assert_eq!(scope.prefix(), "mgd");
    }

    #[tokio::test]
    async fn test_with_operation_owns_its_scope() {
        let root = TempDir::new().unwrap();
        let runner = Arc::new(MockRunner::new());
        let engine = engine(&root, runner.clone());
        let input = Artifact::succeeded("/data/input.tif");

        let (artifact, scope_path) = engine
            .with_operation(
                "gdal_translate",
                OperationOptions::new().with("ot", "Byte").with("of", "GTiff"),
                |op| async move {
                    let scope_path = op.scope().path().to_path_buf();
                    let name = scope_path.file_name().unwrap().to_string_lossy().to_string();
                    assert!(name.starts_with(OPERATION_SCOPE_PREFIX));
                    assert!(op.is_curried());

                    let op = op.bind(&input).await?;
                    assert!(op.output().exists());
                    Ok::<_, EngineError>((op.artifact(), scope_path))
                },
            )
            .await
            .unwrap();

        assert!(!artifact.is_failed());
        assert!(artifact.output().starts_with(&scope_path));
        assert!(!scope_path.exists());
        assert_eq!(runner.invocation_count().await, 1);
    }

    #[tokio::test]
    async fn test_with_operation_bad_options_releases_scope() {
        let root = TempDir::new().unwrap();
        let engine = engine(&root, Arc::new(MockRunner::new()));

        let result = engine
            .with_gdal_translate(OperationOptions::new().with("ot", "Byte"), |_| async move {
                Ok::<_, EngineError>(())
            })
            .await;
        assert!(matches!(
            result,
            Err(EngineError::Operation(OperationError::Configuration { .. }))
        ));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_gdal_translate_path_with_spaces() {
        let root = TempDir::new().unwrap();
        let runner = Arc::new(MockRunner::new());
        let mut config = EngineConfig::default();
        config.scratch.root = root.path().to_path_buf();
        config.tools.gdal_translate = "/opt/GDAL Tools/gdal_translate".to_string();
        let engine = Engine::with_runner(config, runner.clone());

        engine
            .with_gdal_translate(OperationOptions::new().with("of", "GTiff"), |op| async move {
                assert_eq!(op.template().program(), "/opt/GDAL Tools/gdal_translate");
                op.bind(&Artifact::succeeded("/data/in.tif")).await?;
                Ok::<_, EngineError>(())
            })
            .await
            .unwrap();

        assert_eq!(
            runner.programs().await,
            vec!["/opt/GDAL Tools/gdal_translate"]
        );
        let args = runner.invocations().await[0].args().to_vec();
        assert_eq!(args[..2], ["-of".to_string(), "GTiff".to_string()]);
    }

    #[test]
    fn test_new_builds_process_runner() {
        let mut config = EngineConfig::default();
        config.workers.max_concurrent = 3;
        config.execution.timeout_secs = Some(10);
        let engine = Engine::new(config);
        assert_eq!(engine.runner().name(), "process");
        assert_eq!(engine.pool().max_concurrent(), 3);
    }
}
