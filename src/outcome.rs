//! Maps a raw sandbox result to what actually happened.

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::sandbox::{RunOutput, SandboxError, TIMEOUT_EXIT_CODE};

/// What an execution amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Ran cleanly and left a readable artifact.
    Success,
    /// The program exited nonzero or produced no artifact.
    ProgramFailure,
    /// The watchdog killed the program.
    Timeout,
    /// The sandbox could not run the program at all.
    InfraFailure,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::ProgramFailure => write!(f, "program failure"),
            Self::Timeout => write!(f, "timeout"),
            Self::InfraFailure => write!(f, "infrastructure failure"),
        }
    }
}

/// Classified result of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub classification: Classification,
    /// Interleaved stdout and stderr of the program.
    pub output: String,
    /// Present only on `Success`.
    pub artifact: Option<PathBuf>,
}

/// Classifies a sandbox run.
///
/// | run result                         | classification   |
/// |------------------------------------|------------------|
/// | host deadline expired              | `Timeout`        |
/// | any other launch error             | `InfraFailure`   |
/// | exit 124                           | `Timeout`        |
/// | other nonzero exit                 | `ProgramFailure` |
/// | exit 0, artifact missing/unreadable| `ProgramFailure` |
/// | exit 0, artifact readable          | `Success`        |
pub(crate) fn classify(
    run: &Result<RunOutput, SandboxError>,
    workspace: &Path,
    artifact_name: &str,
) -> ExecutionOutcome {
    let out = match run {
        Ok(out) => out,
        Err(SandboxError::Timeout { output, .. }) => {
            return ExecutionOutcome {
                classification: Classification::Timeout,
                output: output.clone(),
                artifact: None,
            };
        }
        Err(e) => {
            error!("Sandbox failed to run program: {}", e);
            return ExecutionOutcome {
                classification: Classification::InfraFailure,
                output: String::new(),
                artifact: None,
            };
        }
    };

    let (classification, artifact) = match out.exit_code {
        TIMEOUT_EXIT_CODE => (Classification::Timeout, None),
        0 => {
            let path = workspace.join(artifact_name);
            if is_readable_file(&path) {
                (Classification::Success, Some(path))
            } else {
                debug!("Program exited cleanly but {} is missing", artifact_name);
                (Classification::ProgramFailure, None)
            }
        }
        _ => (Classification::ProgramFailure, None),
    };

    debug!(
        "Classified exit status {} as {}",
        out.exit_code, classification
    );
    ExecutionOutcome {
        classification,
        output: out.output.clone(),
        artifact,
    }
}

fn is_readable_file(path: &Path) -> bool {
    File::open(path)
        .and_then(|f| f.metadata())
        .is_ok_and(|m| m.is_file())
}
