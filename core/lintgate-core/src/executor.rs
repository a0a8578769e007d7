//! Runs one discovered command under a deadline.
//!
//! A failing lint or test command is the common case, so every outcome (non-zero
//! exit, signal, timeout, launch failure) is a field of [`ExecutionResult`] rather
//! than an error.

use std::time::{Duration, Instant};

use crate::deps::{Dependencies, Exit};
use crate::discovery::DiscoveredCommand;

/// Exit code reported when the command never produced one.
pub const NO_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<String>,
    pub timed_out: bool,
}

pub struct CommandExecutor {
    timeout: Duration,
    deps: Dependencies,
}

impl CommandExecutor {
    pub fn new(timeout: Duration, deps: Dependencies) -> Self {
        Self { timeout, deps }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn execute(&self, cmd: &DiscoveredCommand) -> ExecutionResult {
        let started = Instant::now();
        let output = self.deps.runner.run(&cmd.to_spec(), self.timeout);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        let (success, exit_code, error, timed_out) = match output.exit {
            Exit::Code(0) => (true, 0, None, false),
            Exit::Code(code) => (false, code, Some(format!("exit status {}", code)), false),
            Exit::Signaled => (
                false,
                NO_EXIT_CODE,
                Some("terminated by signal".to_string()),
                false,
            ),
            Exit::TimedOut => (
                false,
                NO_EXIT_CODE,
                Some(format!("command timed out after {}s", self.timeout.as_secs())),
                true,
            ),
            Exit::LaunchFailed(reason) => (false, NO_EXIT_CODE, Some(reason), false),
        };

        tracing::debug!(
            kind = %cmd.kind,
            command = %cmd.display(),
            dir = %cmd.working_dir.display(),
            exit_code,
            timed_out,
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );

        ExecutionResult {
            success,
            exit_code,
            stdout,
            stderr,
            error,
            timed_out,
        }
    }
}
