//! Chaining artifacts and unit operations into pipelines.
//!
//! [`chain`] feeds the result of a left-hand step into a curried right-hand
//! operation. Each link is fully resolved before the next starts. A failure
//! anywhere is carried downstream through the `failed` flag: later commands
//! are skipped, but the chain itself completes.
//!
//! # Example
//!
//! ```ignore
//! let result = Pipeline::new(copied)
//!     .then(translate_to_byte)
//!     .then(translate_to_uint16)
//!     .run()
//!     .await?;
//! assert!(!result.failed());
//! ```

use async_trait::async_trait;
use tracing::debug;

use crate::artifact::Artifact;
use crate::operation::{OperationError, UnitOperation};

/// A value that can be resolved into an artifact for the next link.
#[async_trait]
pub trait Upstream: Send + Sized {
    /// Produces this step's artifact, executing it first if needed.
    async fn resolve(self) -> Result<Artifact, OperationError>;
}

#[async_trait]
impl Upstream for Artifact {
    async fn resolve(self) -> Result<Artifact, OperationError> {
        Ok(self)
    }
}

#[async_trait]
impl Upstream for UnitOperation {
    async fn resolve(self) -> Result<Artifact, OperationError> {
        let op = if self.is_executed() {
            self
        } else {
            self.execute().await?
        };
        Ok(op.artifact())
    }
}

/// Runs `left` (if needed) and binds its artifact into `right`.
///
/// `right` must be curried; anything else is a type mismatch and `left` is
/// left untouched.
pub async fn chain<L: Upstream>(
    left: L,
    right: UnitOperation,
) -> Result<UnitOperation, OperationError> {
    ensure_curried(&right)?;
    let artifact = left.resolve().await?;
    debug!(
        input = %artifact.output().display(),
        failed = artifact.is_failed(),
        next = %right.template(),
        "Chaining step"
    );
    right.bind(&artifact).await
}

fn ensure_curried(op: &UnitOperation) -> Result<(), OperationError> {
    if op.is_curried() {
        Ok(())
    } else {
        Err(OperationError::type_mismatch(format!(
            "not a curried unit operation: {}",
            op.template()
        )))
    }
}

/// Either end of a chain link.
#[derive(Debug, Clone)]
pub enum Stage {
    /// A copied file or other ready-made artifact.
    Artifact(Artifact),
    /// A unit operation, executed or not.
    Operation(UnitOperation),
}

impl Stage {
    /// Artifact view of this stage.
    pub fn artifact(&self) -> Artifact {
        match self {
            Self::Artifact(artifact) => artifact.clone(),
            Self::Operation(op) => op.artifact(),
        }
    }

    /// Whether this stage failed.
    pub fn failed(&self) -> bool {
        match self {
            Self::Artifact(artifact) => artifact.is_failed(),
            Self::Operation(op) => op.failed(),
        }
    }
}

impl From<Artifact> for Stage {
    fn from(artifact: Artifact) -> Self {
        Self::Artifact(artifact)
    }
}

impl From<UnitOperation> for Stage {
    fn from(op: UnitOperation) -> Self {
        Self::Operation(op)
    }
}

#[async_trait]
impl Upstream for Stage {
    async fn resolve(self) -> Result<Artifact, OperationError> {
        match self {
            Self::Artifact(artifact) => artifact.resolve().await,
            Self::Operation(op) => op.resolve().await,
        }
    }
}

/// A left-to-right sequence of chain links.
#[derive(Debug, Clone)]
pub struct Pipeline {
    start: Stage,
    steps: Vec<UnitOperation>,
}

impl Pipeline {
    /// Starts a pipeline at an artifact or a runnable operation.
    pub fn new(start: impl Into<Stage>) -> Self {
        Self {
            start: start.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a curried operation.
    pub fn then(mut self, op: UnitOperation) -> Self {
        self.steps.push(op);
        self
    }

    /// Number of appended operations.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no operations were appended.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every link in order and returns the last stage.
    ///
    /// All steps are checked for being curried before anything runs.
    pub async fn run(self) -> Result<Stage, OperationError> {
        for step in &self.steps {
            ensure_curried(step)?;
        }

        let mut current = self.start;
        for step in self.steps {
            current = Stage::Operation(chain(current, step).await?);
        }
        Ok(current)
    }
}
