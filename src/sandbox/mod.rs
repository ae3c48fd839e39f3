//! Docker sandbox for running untrusted plotting code.
//!
//! The container gets the workspace as its only writable mount, no
//! network, and runs the interpreter under the `timeout` watchdog so the
//! process is killed even if the interpreter ignores signals of its own.

mod docker;
mod error;
#[cfg(test)]
mod mock;

pub(crate) use docker::DockerSandbox;
pub(crate) use error::SandboxError;
#[cfg(test)]
pub(crate) use mock::{MockRun, MockSandbox};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Exit status `timeout(1)` reports when it had to kill the wrapped command.
pub(crate) const TIMEOUT_EXIT_CODE: i64 = 124;

/// Raw result of a sandboxed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunOutput {
    /// Interleaved stdout and stderr.
    pub output: String,
    /// Exit status of the watchdog process.
    pub exit_code: i64,
}

/// Executes the entry point staged in a workspace.
#[async_trait]
pub(crate) trait Sandbox: Send + Sync {
    /// Returns the backend name for logging.
    fn name(&self) -> &'static str;

    /// Runs the workspace's entry point and blocks until it exits or the
    /// watchdog kills it.
    ///
    /// `Err` means the sandbox itself could not run the program.
    async fn run(&self, workspace: &Path, timeout: Duration) -> Result<RunOutput, SandboxError>;
}

/// Builds the in-container command: the watchdog wrapping the interpreter.
pub(crate) fn watchdog_command(
    timeout: Duration,
    interpreter: &str,
    entry_file: &str,
) -> Result<Vec<String>, SandboxError> {
    let interpreter = shell_words::split(interpreter).map_err(|e| {
        SandboxError::invalid_command(format!("failed to parse interpreter command: {e}"))
    })?;
    if interpreter.is_empty() {
        return Err(SandboxError::invalid_command(
            "interpreter command cannot be empty",
        ));
    }

    // timeout(1) treats 0 as "no limit"
    let secs = timeout.as_secs().max(1);

    let mut cmd = Vec::with_capacity(interpreter.len() + 3);
    cmd.push("timeout".to_string());
    cmd.push(secs.to_string());
    cmd.extend(interpreter);
    cmd.push(entry_file.to_string());
    Ok(cmd)
}
