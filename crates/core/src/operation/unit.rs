//! Unit operation implementation.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::OperationError;
use super::options::{OperationOptions, DST_KEY, OUTPUT_FORMAT_KEY, SRC_KEY};
use super::runner::CommandRunner;
use super::template::{CommandTemplate, ResolvedCommand, PLACEHOLDER};
use crate::artifact::Artifact;
use crate::metrics::{OPERATIONS_TOTAL, OPERATION_DURATION};
use crate::scratch::ScopeDir;

/// How an executed operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The command exited with status 0.
    Succeeded,
    /// The command exited non-zero or could not be run.
    Failed { exit_code: Option<i32> },
    /// An upstream step failed, so the command was never invoked.
    Skipped,
}

/// Lifecycle of a unit operation: `Curried -> Bound -> Executed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// The source slot is unresolved.
    Curried,
    /// Every argument is known; ready to run.
    Bound,
    /// Terminal.
    Executed(ExecutionOutcome),
}

/// An external command invocation whose output lives in a scratch scope.
#[derive(Clone)]
pub struct UnitOperation {
    template: CommandTemplate,
    output: PathBuf,
    scope: ScopeDir,
    bound: Option<ResolvedCommand>,
    state: OperationState,
    failed: bool,
    runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for UnitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOperation")
            .field("template", &self.template.to_string())
            .field("output", &self.output)
            .field("state", &self.state)
            .field("failed", &self.failed)
            .field("runner", &self.runner.name())
            .finish()
    }
}

impl UnitOperation {
    /// Creates an operation from a command template and a full option set.
    ///
    /// `src` and `dst` are required. `src` may be [`PLACEHOLDER`] to leave the
    /// input unresolved. `dst` is a file name relative to `scope`. Every other
    /// option is appended as `-key value` in insertion order, followed by the
    /// source and the output path.
    pub fn new(
        scope: &ScopeDir,
        command: &str,
        options: OperationOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, OperationError> {
        Self::from_template(scope, CommandTemplate::parse(command)?, options, runner)
    }

    /// Like [`UnitOperation::new`], starting from an already built template.
    ///
    /// Use this for program paths that may contain whitespace.
    pub fn from_template(
        scope: &ScopeDir,
        mut template: CommandTemplate,
        mut options: OperationOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, OperationError> {
        let src = options
            .remove(SRC_KEY)
            .ok_or_else(|| OperationError::configuration("missing required option 'src'"))?;
        let dst = options
            .remove(DST_KEY)
            .ok_or_else(|| OperationError::configuration("missing required option 'dst'"))?;
        let output = Self::output_path(scope, &dst)?;

        for (key, value) in options.iter() {
            template.push_literal(format!("-{}", key))?;
            template.push_literal(value)?;
        }
        if src == PLACEHOLDER {
            template.push_source();
        } else {
            template.push_literal(src)?;
        }
        template.push_literal(output.to_string_lossy())?;

        let (state, bound) = if template.is_curried() {
            (OperationState::Curried, None)
        } else {
            (OperationState::Bound, Some(template.resolve(None)?))
        };

        debug!(template = %template, state = ?state, "Created unit operation");

        Ok(Self {
            template,
            output,
            scope: scope.clone(),
            bound,
            state,
            failed: false,
            runner,
        })
    }

    /// Creates an operation that awaits its input unless `src` is given.
    ///
    /// Without `dst`, a unique output name is generated when the output-format
    /// option `of` is present; otherwise construction fails.
    pub fn curried(
        scope: &ScopeDir,
        command: &str,
        options: OperationOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, OperationError> {
        Self::curried_from_template(scope, CommandTemplate::parse(command)?, options, runner)
    }

    /// Like [`UnitOperation::curried`], starting from an already built template.
    pub fn curried_from_template(
        scope: &ScopeDir,
        template: CommandTemplate,
        mut options: OperationOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, OperationError> {
        if !options.contains_key(SRC_KEY) {
            options.set(SRC_KEY, PLACEHOLDER);
        }
        if !options.contains_key(DST_KEY) {
            if !options.contains_key(OUTPUT_FORMAT_KEY) {
                return Err(OperationError::configuration(format!(
                    "either '{}' or the output format option '{}' must be specified",
                    DST_KEY, OUTPUT_FORMAT_KEY
                )));
            }
            options.set(DST_KEY, Uuid::new_v4());
        }
        Self::from_template(scope, template, options, runner)
    }

    fn output_path(scope: &ScopeDir, dst: &str) -> Result<PathBuf, OperationError> {
        if dst.is_empty() || dst.contains(PLACEHOLDER) {
            return Err(OperationError::configuration(format!(
                "invalid destination name: '{}'",
                dst
            )));
        }
        let relative = Path::new(dst);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(OperationError::configuration(format!(
                "destination must stay inside the scratch scope: '{}'",
                dst
            )));
        }
        Ok(scope.join(relative))
    }

    /// Binds the upstream artifact to the source slot and executes.
    ///
    /// If `input` failed, the command is skipped and this operation is marked
    /// failed. Binding an operation that is not curried is a type mismatch.
    pub async fn bind(mut self, input: &Artifact) -> Result<Self, OperationError> {
        if self.state != OperationState::Curried {
            return Err(OperationError::type_mismatch(format!(
                "operation is not curried ({:?}): {}",
                self.state, self.template
            )));
        }

        if input.is_failed() {
            warn!(
                program = %self.template.program(),
                upstream = %input.output().display(),
                "Upstream step failed, skipping operation"
            );
            self.finish(ExecutionOutcome::Skipped);
            return Ok(self);
        }

        self.bound = Some(self.template.resolve(Some(input.output()))?);
        self.state = OperationState::Bound;
        self.execute().await
    }

    /// Runs the bound command.
    ///
    /// A non-zero exit marks the operation failed and is logged, not
    /// returned. An operation that already executed is returned unchanged.
    pub async fn execute(mut self) -> Result<Self, OperationError> {
        match self.state {
            OperationState::Curried => Err(OperationError::IncompleteBinding {
                command: self.template.to_string(),
            }),
            OperationState::Executed(outcome) => {
                debug!(template = %self.template, ?outcome, "Operation already executed");
                Ok(self)
            }
            OperationState::Bound => {
                let command = self
                    .bound
                    .take()
                    .ok_or_else(|| OperationError::IncompleteBinding {
                        command: self.template.to_string(),
                    })?;
                let outcome = self.run(&command).await;
                self.bound = Some(command);
                self.finish(outcome);
                Ok(self)
            }
        }
    }

    async fn run(&self, command: &ResolvedCommand) -> ExecutionOutcome {
        info!(command = %command, runner = self.runner.name(), "Executing unit operation");
        let start = Instant::now();
        let result = self.runner.run(command).await;
        OPERATION_DURATION
            .with_label_values(&[command.program()])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(status) if status.success() => ExecutionOutcome::Succeeded,
            Ok(status) => {
                warn!(
                    command = %command,
                    exit_code = ?status.exit_code,
                    stderr = status.stderr.as_deref().unwrap_or_default(),
                    "Command failed"
                );
                ExecutionOutcome::Failed {
                    exit_code: status.exit_code,
                }
            }
            Err(e) => {
                warn!(command = %command, error = %e, "Command could not be run");
                ExecutionOutcome::Failed { exit_code: None }
            }
        }
    }

    fn finish(&mut self, outcome: ExecutionOutcome) {
        let label = match outcome {
            ExecutionOutcome::Succeeded => "succeeded",
            ExecutionOutcome::Failed { .. } => "failed",
            ExecutionOutcome::Skipped => "skipped",
        };
        OPERATIONS_TOTAL
            .with_label_values(&[self.template.program(), label])
            .inc();
        self.failed = outcome != ExecutionOutcome::Succeeded;
        self.state = OperationState::Executed(outcome);
    }

    /// The operation's result as an artifact.
    pub fn artifact(&self) -> Artifact {
        Artifact::with_status(self.output.clone(), self.failed)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Whether the source slot is still unresolved.
    pub fn is_curried(&self) -> bool {
        self.state == OperationState::Curried
    }

    /// Whether the command has run (or was skipped).
    pub fn is_executed(&self) -> bool {
        matches!(self.state, OperationState::Executed(_))
    }

    /// Whether this operation, or an upstream step, failed.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Output path inside the scratch scope.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Scratch scope owning the output.
    pub fn scope(&self) -> &ScopeDir {
        &self.scope
    }

    /// The command template, with the placeholder where the source goes.
    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    /// The resolved command, once bound.
    pub fn command(&self) -> Option<&ResolvedCommand> {
        self.bound.as_ref()
    }

    /// The resolved command line, once bound.
    pub fn command_line(&self) -> Option<String> {
        self.bound.as_ref().map(|c| c.to_string())
    }
}
