//! The command execution boundary.
//!
//! The scheduler does not interpret a job's command; it hands the string to
//! a [`CommandExecutor`] and observes success or failure. [`ShellExecutor`]
//! is the default implementation, running commands through `sh -c`.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Errors from executing a job's command.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The command ran and exited non-zero.
    #[error("command failed with exit code {code}: {stderr}")]
    CommandFailed { code: i32, stderr: String },

    /// The command could not be started.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),

    /// The command exceeded its time limit.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
}

/// Executes a job's command. Opaque boundary: implementations decide what
/// the command string means.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run the command to completion, returning success or an error value.
    async fn execute(&self, command: &str) -> Result<(), ActionError>;
}

/// Executor that runs commands through `sh -c`.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    /// Optional per-command time limit.
    timeout: Option<Duration>,
}

impl ShellExecutor {
    /// Create an executor with no time limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a per-command time limit.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &str) -> Result<(), ActionError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match self.timeout {
            Some(limit) => timeout(limit, cmd.output())
                .await
                .map_err(|_| ActionError::Timeout(limit))?
                .map_err(|e| ActionError::ExecutionFailed(e.to_string()))?,
            None => cmd
                .output()
                .await
                .map_err(|e| ActionError::ExecutionFailed(e.to_string()))?,
        };

        if output.status.success() {
            Ok(())
        } else {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(ActionError::CommandFailed { code, stderr })
        }
    }
}
