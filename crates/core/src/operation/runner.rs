//! Execution of resolved commands.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::error::RunnerError;
use super::template::ResolvedCommand;
use crate::worker::WorkerPool;

/// Exit information of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code, `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard error, when capture is enabled.
    pub stderr: Option<String>,
}

impl CommandStatus {
    /// A status with the given exit code and nothing captured.
    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            stderr: None,
        }
    }

    /// Exit code 0 is success; anything else is failure.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Something that can run a resolved command to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Returns the name of this runner implementation.
    fn name(&self) -> &str;

    /// Runs the command and waits for it to exit.
    async fn run(&self, command: &ResolvedCommand) -> Result<CommandStatus, RunnerError>;
}

/// Runs commands as child processes, directly and without a shell.
///
/// Each invocation holds a worker pool slot while the child runs.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    pool: WorkerPool,
    timeout: Option<Duration>,
    capture_stderr: bool,
}

impl ProcessRunner {
    /// Creates a runner that waits on children using `pool`.
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            pool,
            timeout: None,
            capture_stderr: false,
        }
    }

    /// Kills children that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Captures standard error instead of passing it through.
    pub fn with_captured_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    async fn spawn_and_wait(&self, command: &ResolvedCommand) -> Result<CommandStatus, RunnerError> {
        let child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(if self.capture_stderr {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RunnerError::ProgramNotFound {
                        program: command.program().to_string(),
                    }
                } else {
                    RunnerError::Io(e)
                }
            })?;
        debug!(pid = ?child.id(), command = %command, "Spawned command");

        // Dropping the wait future on timeout drops the child, which kills it.
        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| RunnerError::Timeout {
                    command: command.to_string(),
                    timeout: limit,
                })??,
            None => wait.await?,
        };

        let stderr = if self.capture_stderr && !output.stderr.is_empty() {
            Some(String::from_utf8_lossy(&output.stderr).to_string())
        } else {
            None
        };

        Ok(CommandStatus {
            exit_code: output.status.code(),
            stderr,
        })
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    fn name(&self) -> &str {
        "process"
    }

    async fn run(&self, command: &ResolvedCommand) -> Result<CommandStatus, RunnerError> {
        self.pool.run(self.spawn_and_wait(command)).await?
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ResolvedCommand {
        ResolvedCommand::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_exit_codes() {
        let runner = ProcessRunner::new(WorkerPool::new("test", 2));

        let ok = runner.run(&sh("exit 0")).await.unwrap();
        assert!(ok.success());

        let failed = runner.run(&sh("exit 3")).await.unwrap();
        assert!(!failed.success());
        assert_eq!(failed.exit_code, Some(3));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let runner = ProcessRunner::new(WorkerPool::new("test", 1));
        let command = ResolvedCommand::new("rasterchain-no-such-program", vec![]);
        assert!(matches!(
            runner.run(&command).await,
            Err(RunnerError::ProgramNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_captures_stderr() {
        let runner = ProcessRunner::new(WorkerPool::new("test", 1)).with_captured_stderr(true);
        let status = runner.run(&sh("echo oops >&2; exit 1")).await.unwrap();
        assert_eq!(status.stderr.as_deref(), Some("oops\n"));
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_interpreted() {
        let runner = ProcessRunner::new(WorkerPool::new("test", 1));
        let args = vec!["a; exit 1", "=", "a; exit 1"]
            .into_iter()
            .map(String::from)
            .collect();
        let command = ResolvedCommand::new("test", args);
        assert!(runner.run(&command).await.unwrap().success());
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let runner = ProcessRunner::new(WorkerPool::new("test", 1))
            .with_timeout(Duration::from_millis(100));
        let started = std::time::Instant::now();
        let result = runner.run(&sh("sleep 5")).await;
        match result {
            Err(RunnerError::Timeout { timeout, ref command }) => {
                assert_eq!(timeout, Duration::from_millis(100));
                assert!(command.starts_with("sh"));
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(4));

        let message = RunnerError::Timeout {
            command: "sleep 5".to_string(),
            timeout: Duration::from_millis(250),
        }
        .to_string();
        assert!(message.contains("250ms"), "{}", message);
    }
}
