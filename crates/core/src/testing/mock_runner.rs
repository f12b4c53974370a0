//! Mock command runner for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::operation::{CommandRunner, CommandStatus, ResolvedCommand, RunnerError};

/// Mock implementation of the CommandRunner trait.
///
/// Provides controllable behavior for testing:
/// - Records every invocation for assertions
/// - Per-program exit codes (default 0)
/// - Programs that are "not installed"
/// - Simulated run time
/// - Writes a small output file at the last argument on success
#[derive(Debug, Clone)]
pub struct MockRunner {
    invocations: Arc<RwLock<Vec<ResolvedCommand>>>,
    exit_codes: Arc<RwLock<HashMap<String, i32>>>,
    missing: Arc<RwLock<HashSet<String>>>,
    delay: Arc<RwLock<Duration>>,
    write_outputs: Arc<RwLock<bool>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    /// Create a new mock runner where every program succeeds.
    pub fn new() -> Self {
        Self {
            invocations: Arc::new(RwLock::new(Vec::new())),
            exit_codes: Arc::new(RwLock::new(HashMap::new())),
            missing: Arc::new(RwLock::new(HashSet::new())),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            write_outputs: Arc::new(RwLock::new(true)),
        }
    }

    /// Get all recorded invocations.
    pub async fn invocations(&self) -> Vec<ResolvedCommand> {
        self.invocations.read().await.clone()
    }

    /// Get the number of invocations.
    pub async fn invocation_count(&self) -> usize {
        self.invocations.read().await.len()
    }

    /// Get the program names invoked, in order.
    pub async fn programs(&self) -> Vec<String> {
        self.invocations
            .read()
            .await
            .iter()
            .map(|c| c.program().to_string())
            .collect()
    }

    /// Clear recorded invocations.
    pub async fn clear_recorded(&self) {
        self.invocations.write().await.clear();
    }

    /// Make `program` exit with `code`.
    pub async fn set_exit_code(&self, program: &str, code: i32) {
        self.exit_codes
            .write()
            .await
            .insert(program.to_string(), code);
    }

    /// Make `program` behave as if it were not installed.
    pub async fn set_missing(&self, program: &str) {
        self.missing.write().await.insert(program.to_string());
    }

    /// Set the simulated run time of every command.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Whether successful commands write their last argument as a file.
    pub async fn set_write_outputs(&self, enabled: bool) {
        *self.write_outputs.write().await = enabled;
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, command: &ResolvedCommand) -> Result<CommandStatus, RunnerError> {
        if self.missing.read().await.contains(command.program()) {
            return Err(RunnerError::ProgramNotFound {
                program: command.program().to_string(),
            });
        }

        self.invocations.write().await.push(command.clone());

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let code = self
            .exit_codes
            .read()
            .await
            .get(command.program())
            .copied()
            .unwrap_or(0);

        if code == 0 && *self.write_outputs.read().await {
            if let Some(output) = command.args().last().map(Path::new) {
                if output.parent().is_some_and(|p| p.is_dir()) {
                    tokio::fs::write(output, command.to_string()).await?;
                }
            }
        }

        Ok(CommandStatus::exited(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_exit_codes() {
        let runner = MockRunner::new();
        runner.set_exit_code("bad", 2).await;
        runner.set_write_outputs(false).await;

        let ok = runner
            .run(&ResolvedCommand::new("good", vec![]))
            .await
            .unwrap();
        let bad = runner
            .run(&ResolvedCommand::new("bad", vec![]))
            .await
            .unwrap();

        assert!(ok.success());
        assert_eq!(bad.exit_code, Some(2));
        assert_eq!(runner.programs().await, vec!["good", "bad"]);

        runner.clear_recorded().await;
        assert_eq!(runner.invocation_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_program_is_not_recorded() {
        let runner = MockRunner::new();
        runner.set_missing("gdal_translate").await;
        let result = runner
            .run(&ResolvedCommand::new("gdal_translate", vec![]))
            .await;
        assert!(matches!(result, Err(RunnerError::ProgramNotFound { .. })));
        assert_eq!(runner.invocation_count().await, 0);
    }

    #[tokio::test]
    async fn test_writes_output_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("out.tif");
        let runner = MockRunner::new();

        runner
            .run(&ResolvedCommand::new(
                "cmd",
                vec![output.to_string_lossy().to_string()],
            ))
            .await
            .unwrap();
        assert!(output.exists());
    }
}
