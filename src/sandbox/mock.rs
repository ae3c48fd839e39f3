//! Mock sandbox for testing.
//!
//! Plays back scripted runs without Docker, optionally writing files into the
//! workspace the way a real program would.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{RunOutput, Sandbox, SandboxError, TIMEOUT_EXIT_CODE};

/// A single scripted run.
#[derive(Debug, Clone)]
pub(crate) enum MockRun {
    /// Exit with `code`, printing `output` and writing `files` first.
    Exit {
        code: i64,
        output: String,
        files: Vec<(String, Vec<u8>)>,
    },
    /// Fail to launch at all.
    LaunchFailure(String),
    /// Host-side deadline expired after `output` was printed.
    HostTimeout(String),
}

/// A mock sandbox that replays `MockRun`s in order, cycling when exhausted.
#[derive(Debug, Clone)]
pub(crate) struct MockSandbox {
    runs: Arc<Vec<MockRun>>,
    invocations: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(PathBuf, Vec<String>)>>>,
}

impl MockSandbox {
    pub fn new(runs: Vec<MockRun>) -> Self {
        Self {
            runs: Arc::new(runs),
            invocations: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Exits 0 after writing `artifact` with `content`.
    pub fn renders(artifact: &str, content: &str) -> Self {
        Self::new(vec![MockRun::Exit {
            code: 0,
            output: "Saving 8 x 8 in image\n".to_string(),
            files: vec![(artifact.to_string(), content.as_bytes().to_vec())],
        }])
    }

    /// Exits with `code` without producing anything.
    pub fn exits(code: i64, output: &str) -> Self {
        Self::new(vec![MockRun::Exit {
            code,
            output: output.to_string(),
            files: Vec::new(),
        }])
    }

    /// Behaves as if the watchdog killed the program.
    pub fn times_out() -> Self {
        Self::exits(TIMEOUT_EXIT_CODE, "")
    }

    pub fn fails_to_launch(message: &str) -> Self {
        Self::new(vec![MockRun::LaunchFailure(message.to_string())])
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Workspaces the sandbox was pointed at, in call order.
    pub fn workspaces(&self) -> Vec<PathBuf> {
        self.seen
            .lock()
            .map(|s| s.iter().map(|(path, _)| path.clone()).collect())
            .unwrap_or_default()
    }

    /// Sorted file names present in each workspace when the run started.
    pub fn staged_files(&self) -> Vec<Vec<String>> {
        self.seen
            .lock()
            .map(|s| s.iter().map(|(_, files)| files.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sandbox for MockSandbox {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn run(&self, workspace: &Path, timeout: Duration) -> Result<RunOutput, SandboxError> {
        let count = self.invocations.fetch_add(1, Ordering::SeqCst);
        let mut staged: Vec<String> = std::fs::read_dir(workspace)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        staged.sort();
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((workspace.to_path_buf(), staged));
        }

        match &self.runs[count % self.runs.len()] {
            MockRun::Exit {
                code,
                output,
                files,
            } => {
                for (name, content) in files {
                    std::fs::write(workspace.join(name), content)
                        .map_err(|e| SandboxError::container_failed(e.to_string()))?;
                }
                Ok(RunOutput {
                    output: output.clone(),
                    exit_code: *code,
                })
            }
            MockRun::LaunchFailure(message) => Err(SandboxError::docker_unavailable(message)),
            MockRun::HostTimeout(output) => Err(SandboxError::timeout(timeout, output.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_mock_writes_scripted_files() {
        let dir = tempdir().unwrap();
        let sandbox = MockSandbox::renders("img.svg", "<svg/>");

        let out = sandbox
            .run(dir.path(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(out.exit_code, 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("img.svg")).unwrap(),
            "<svg/>"
        );
        assert_eq!(sandbox.invocation_count(), 1);
        assert_eq!(sandbox.workspaces(), vec![dir.path().to_path_buf()]);
        assert_eq!(sandbox.staged_files(), vec![Vec::<String>::new()]);
    }

    #[tokio::test]
    async fn test_mock_cycles_runs() {
        let dir = tempdir().unwrap();
        let sandbox = MockSandbox::new(vec![
            MockRun::Exit {
                code: 1,
                output: "first".to_string(),
                files: Vec::new(),
            },
            MockRun::LaunchFailure("no daemon".to_string()),
        ]);

        let first = sandbox.run(dir.path(), Duration::from_secs(1)).await;
        let second = sandbox.run(dir.path(), Duration::from_secs(1)).await;
        let third = sandbox.run(dir.path(), Duration::from_secs(1)).await;

        assert_eq!(first.unwrap().output, "first");
        assert!(matches!(
            second.unwrap_err(),
            SandboxError::DockerUnavailable { .. }
        ));
        assert_eq!(third.unwrap().exit_code, 1);
    }
}
