//! Execution pipeline: stage, synthesize, run, classify, read back.
//!
//! Every execution owns one workspace for its whole duration. The
//! workspace is released on every exit path: explicitly after the artifact
//! has been read, or by its `Drop` if anything in between fails or panics.

use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::error::EngineError;
use crate::outcome::{classify, Classification};
use crate::program::{stage_file, synthesize, ImageFormat, RenderOptions};
use crate::sandbox::{Sandbox, SandboxError};
use crate::submission::Submission;
use crate::workspace::{Workspace, WorkspaceError, WorkspaceManager};

/// Rendered image read back out of the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Result of one execution once its workspace is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Never `InfraFailure`; those come back as `EngineError::Infra`.
    pub classification: Classification,
    pub output: String,
    /// Present only on `Success`.
    pub artifact: Option<Artifact>,
}

impl Execution {
    pub fn is_success(&self) -> bool {
        self.classification == Classification::Success
    }
}

/// Runs submissions in sandboxes, a bounded number at a time.
pub(crate) struct Engine {
    workspaces: WorkspaceManager,
    sandbox: Arc<dyn Sandbox>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl Engine {
    pub fn new(
        workspaces: WorkspaceManager,
        sandbox: Arc<dyn Sandbox>,
        timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            workspaces,
            sandbox,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    /// Overrides the per-execution time budget.
    #[cfg(test)]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Executes a submission and reads back its artifact.
    ///
    /// Input is validated before a workspace is created. Program failures
    /// and timeouts are returned as an `Execution`; only server faults are
    /// errors.
    pub async fn execute(
        &self,
        submission: &Submission,
        options: &RenderOptions,
    ) -> Result<Execution, EngineError> {
        submission.validate()?;
        options.validate()?;

        let ws = self.workspaces.acquire()?;
        let result = self.execute_in(&ws, submission, options).await;

        match (result, ws.release()) {
            (result, Ok(())) => result,
            // The execution error is the more useful one to report
            (Err(e), Err(release_err)) => {
                error!("{}", release_err);
                Err(e)
            }
            (Ok(_), Err(release_err)) => Err(release_err.into()),
        }
    }

    async fn execute_in(
        &self,
        ws: &Workspace,
        submission: &Submission,
        options: &RenderOptions,
    ) -> Result<Execution, EngineError> {
        for (name, content) in &submission.files {
            stage_file(ws, name, content)?;
        }
        synthesize(ws, &submission.code, options)?;

        let run = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| SandboxError::container_failed("sandbox pool is closed"))?;
            debug!(
                "Running {} in {} sandbox (timeout {:?})",
                ws.path().display(),
                self.sandbox.name(),
                self.timeout
            );
            self.sandbox.run(ws.path(), self.timeout).await
        };

        let artifact_name = options.artifact_name();
        let outcome = classify(&run, ws.path(), &artifact_name);
        if let Err(e) = run {
            if outcome.classification == Classification::InfraFailure {
                return Err(e.into());
            }
        }

        let artifact = match outcome.artifact {
            Some(ref path) => Some(Artifact {
                format: options.format,
                bytes: fs::read(path).map_err(|e| WorkspaceError::io(path, e))?,
            }),
            None => None,
        };

        info!("Execution finished: {}", outcome.classification);
        Ok(Execution {
            classification: outcome.classification,
            output: outcome.output,
            artifact,
        })
    }
}
