use async_trait::async_trait;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::models::ContainerWaitResponse;
use bollard::service::HostConfig;
use bollard::Docker;
use futures_util::StreamExt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{watchdog_command, RunOutput, Sandbox, SandboxError};
use crate::config::SandboxConfig;
use crate::program::ENTRY_FILE;

/// Where the workspace is mounted inside the container.
const CONTAINER_WORKDIR: &str = "/tmp";

/// Extra time the host waits for the in-container watchdog before giving up.
const WATCHDOG_GRACE: Duration = Duration::from_secs(5);

/// Runs the interpreter inside a throwaway Docker container.
pub struct DockerSandbox {
    config: SandboxConfig,
}

impl DockerSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> Result<Docker, SandboxError> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| {
            SandboxError::docker_unavailable(format!("failed to connect: {e}"))
        })?;

        docker
            .ping()
            .await
            .map_err(|e| SandboxError::docker_unavailable(format!("cannot ping daemon: {e}")))?;

        Ok(docker)
    }

    fn build_container_config(
        &self,
        host_dir: &str,
        user: Option<String>,
        timeout: Duration,
    ) -> Result<ContainerConfig<String>, SandboxError> {
        let resources = &self.config.resources;
        let memory = parse_memory_limit(&resources.memory)?;
        #[allow(clippy::cast_possible_truncation)]
        let nano_cpus = (parse_cpus(&resources.cpus)? * 1_000_000_000.0) as i64;

        let cmd = watchdog_command(timeout, &self.config.interpreter, ENTRY_FILE)?;

        Ok(ContainerConfig {
            image: Some(self.config.image.clone()),
            cmd: Some(cmd),
            // Without capabilities, only the owner can write to the mount
            user,
            env: Some(vec![format!("HOME={CONTAINER_WORKDIR}")]),
            working_dir: Some(CONTAINER_WORKDIR.to_string()),
            network_disabled: Some(true),
            host_config: Some(HostConfig {
                // The workspace is the only writable filesystem
                binds: Some(vec![format!("{host_dir}:{CONTAINER_WORKDIR}:rw")]),
                readonly_rootfs: Some(true),
                network_mode: Some("none".to_string()),
                memory: Some(memory),
                nano_cpus: Some(nano_cpus),
                cap_drop: Some(vec!["ALL".to_string()]),
                security_opt: Some(vec!["no-new-privileges".to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    async fn start_and_wait(
        &self,
        docker: &Docker,
        container_name: &str,
        timeout: Duration,
    ) -> Result<RunOutput, SandboxError> {
        debug!("Starting container {}", container_name);
        docker
            .start_container::<String>(container_name, None)
            .await
            .map_err(|e| SandboxError::container_failed(format!("failed to start: {e}")))?;

        let deadline = timeout + WATCHDOG_GRACE;
        let exit_code = match tokio::time::timeout(deadline, wait_for_exit(docker, container_name))
            .await
        {
            Ok(code) => code?,
            Err(_) => {
                warn!(
                    "Container {} outlived its watchdog, killing it",
                    container_name
                );
                let output = collect_output(docker, container_name)
                    .await
                    .unwrap_or_else(|e| {
                        warn!("No output from {}: {}", container_name, e);
                        String::new()
                    });
                return Err(SandboxError::timeout(timeout, output));
            }
        };

        let output = collect_output(docker, container_name).await?;
        Ok(RunOutput { output, exit_code })
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn run(&self, workspace: &Path, timeout: Duration) -> Result<RunOutput, SandboxError> {
        let docker = self.connect().await?;

        // Bind mounts need an absolute host path
        let host_dir = workspace.canonicalize().map_err(|e| {
            SandboxError::container_failed(format!(
                "cannot resolve workspace {}: {e}",
                workspace.display()
            ))
        })?;
        let host_dir = host_dir
            .to_str()
            .ok_or_else(|| SandboxError::container_failed("workspace path is not valid UTF-8"))?;

        let user = workspace_owner(Path::new(host_dir))?;
        let container_config = self.build_container_config(host_dir, user, timeout)?;
        let container_name = format!("plotbox-{}", uuid::Uuid::new_v4().simple());

        debug!("Creating container {}", container_name);
        docker
            .create_container(
                Some(CreateContainerOptions {
                    name: container_name.clone(),
                    platform: None,
                }),
                container_config,
            )
            .await
            .map_err(|e| create_error(e, &self.config.image))?;

        let result = self.start_and_wait(&docker, &container_name, timeout).await;

        debug!("Removing container {}", container_name);
        if let Err(e) = docker
            .remove_container(
                &container_name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            warn!("Failed to remove container {}: {}", container_name, e);
        }

        if let Ok(ref out) = result {
            info!(
                "Container {} exited with status {}",
                container_name, out.exit_code
            );
        }
        result
    }
}

async fn wait_for_exit(docker: &Docker, container_name: &str) -> Result<i64, SandboxError> {
    let mut stream = Box::pin(docker.wait_container(
        container_name,
        Some(WaitContainerOptions {
            condition: "not-running",
        }),
    ));

    exit_status(stream.next().await)
}

/// Turns the first item of a wait stream into the container's exit status.
fn exit_status(
    next: Option<Result<ContainerWaitResponse, DockerError>>,
) -> Result<i64, SandboxError> {
    match next {
        Some(Ok(response)) => Ok(response.status_code),
        // bollard reports nonzero exits as errors carrying the status
        Some(Err(DockerError::DockerContainerWaitError { code, .. })) => Ok(code),
        Some(Err(e)) => Err(SandboxError::container_failed(format!(
            "failed to wait: {e}"
        ))),
        None => Err(SandboxError::container_failed(
            "wait stream ended without an exit status",
        )),
    }
}

fn create_error(err: DockerError, image: &str) -> SandboxError {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => SandboxError::image_not_found(image),
        other => SandboxError::container_failed(format!("failed to create: {other}")),
    }
}

/// `uid:gid` owning the workspace on the host.
#[cfg(unix)]
fn workspace_owner(dir: &Path) -> Result<Option<String>, SandboxError> {
    use std::os::unix::fs::MetadataExt;

    let meta = std::fs::metadata(dir).map_err(|e| {
        SandboxError::container_failed(format!("cannot stat workspace {}: {e}", dir.display()))
    })?;
    Ok(Some(format!("{}:{}", meta.uid(), meta.gid())))
}

#[cfg(not(unix))]
fn workspace_owner(_dir: &Path) -> Result<Option<String>, SandboxError> {
    Ok(None)
}

/// Reads stdout and stderr in the order the container wrote them.
async fn collect_output(docker: &Docker, container_name: &str) -> Result<String, SandboxError> {
    let mut stream = Box::pin(docker.logs(
        container_name,
        Some(LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: "all".to_string(),
            ..Default::default()
        }),
    ));

    let mut output = String::new();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(
                LogOutput::StdOut { message }
                | LogOutput::StdErr { message }
                | LogOutput::Console { message },
            ) => {
                output.push_str(&String::from_utf8_lossy(&message));
            }
            Ok(LogOutput::StdIn { .. }) => {}
            Err(e) => {
                return Err(SandboxError::container_failed(format!(
                    "failed to read output: {e}"
                )));
            }
        }
    }
    Ok(output)
}

/// Parse memory limit string (e.g., "1g", "512m") to bytes
fn parse_memory_limit(limit: &str) -> Result<i64, SandboxError> {
    let limit = limit.trim().to_lowercase();
    let invalid = |_| SandboxError::invalid_command(format!("invalid memory limit '{limit}'"));

    let (num, unit) = if let Some(num) = limit.strip_suffix('g') {
        (num, 1024 * 1024 * 1024)
    } else if let Some(num) = limit.strip_suffix('m') {
        (num, 1024 * 1024)
    } else {
        (limit.as_str(), 1)
    };

    let value: i64 = num.parse().map_err(invalid)?;
    match value.checked_mul(unit) {
        Some(bytes) if bytes > 0 => Ok(bytes),
        _ => Err(SandboxError::invalid_command(format!(
            "memory limit '{limit}' is out of range"
        ))),
    }
}

fn parse_cpus(cpus: &str) -> Result<f64, SandboxError> {
    match cpus.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => Ok(n),
        _ => Err(SandboxError::invalid_command(format!(
            "invalid cpu limit '{cpus}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ResourceConfig, SandboxConfig};
    use crate::sandbox::TIMEOUT_EXIT_CODE;

    #[test]
    fn test_parse_memory_limit() {
        assert_eq!(parse_memory_limit("8g").unwrap(), 8 * 1024 * 1024 * 1024);
        assert_eq!(parse_memory_limit("512m").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_memory_limit("1G").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_memory_limit("1048576").unwrap(), 1_048_576);
        assert!(parse_memory_limit("lots").is_err());
        assert!(parse_memory_limit("0m").is_err());
        assert!(parse_memory_limit("-1g").is_err());
        assert!(parse_memory_limit("9000000000g").is_err());
        assert!(parse_memory_limit(&format!("{}m", i64::MAX)).is_err());
    }

    #[test]
    fn test_parse_cpus() {
        assert!((parse_cpus("1.5").unwrap() - 1.5).abs() < f64::EPSILON);
        assert!(parse_cpus("0").is_err());
        assert!(parse_cpus("many").is_err());
    }

    #[test]
    fn test_container_config_is_isolated() {
        let sandbox = DockerSandbox::new(SandboxConfig::default());
        let config = sandbox
            .build_container_config(
                "/var/tmp/plotbox-abc",
                Some("1000:1000".to_string()),
                Duration::from_secs(10),
            )
            .unwrap();

        assert_eq!(config.image.as_deref(), Some("quay.io/edvakf/r-ggplot2"));
        assert_eq!(config.user.as_deref(), Some("1000:1000"));
        assert_eq!(config.env, Some(vec!["HOME=/tmp".to_string()]));
        assert_eq!(config.working_dir.as_deref(), Some("/tmp"));
        assert_eq!(config.network_disabled, Some(true));

        let cmd = config.cmd.unwrap();
        assert_eq!(&cmd[..2], ["timeout", "10"]);
        assert_eq!(cmd.last().map(String::as_str), Some("program.R"));

        let host = config.host_config.unwrap();
        assert_eq!(host.network_mode.as_deref(), Some("none"));
        assert_eq!(host.readonly_rootfs, Some(true));
        assert_eq!(
            host.binds.unwrap(),
            vec!["/var/tmp/plotbox-abc:/tmp:rw".to_string()]
        );
        assert_eq!(host.memory, Some(1024 * 1024 * 1024));
        assert_eq!(host.nano_cpus, Some(1_000_000_000));
        assert_eq!(host.cap_drop, Some(vec!["ALL".to_string()]));
    }

    #[cfg(unix)]
    #[test]
    fn test_workspace_owner_matches_directory() {
        use std::os::unix::fs::MetadataExt;

        let dir = tempfile::tempdir().unwrap();
        let meta = std::fs::metadata(dir.path()).unwrap();

        assert_eq!(
            workspace_owner(dir.path()).unwrap(),
            Some(format!("{}:{}", meta.uid(), meta.gid()))
        );
        assert!(workspace_owner(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_exit_status_from_wait_response() {
        let clean = exit_status(Some(Ok(ContainerWaitResponse {
            status_code: 0,
            error: None,
        })));
        assert_eq!(clean.unwrap(), 0);
    }

    #[test]
    fn test_exit_status_from_nonzero_wait_error() {
        for code in [1, TIMEOUT_EXIT_CODE, 137] {
            let status = exit_status(Some(Err(DockerError::DockerContainerWaitError {
                error: String::new(),
                code,
            })));
            assert_eq!(status.unwrap(), code);
        }
    }

    #[test]
    fn test_exit_status_from_other_errors_is_container_failure() {
        let server = exit_status(Some(Err(DockerError::DockerResponseServerError {
            status_code: 500,
            message: "daemon exploded".to_string(),
        })));
        assert!(matches!(
            server,
            Err(SandboxError::ContainerFailed { ref message }) if message.contains("daemon exploded")
        ));

        assert!(matches!(
            exit_status(None),
            Err(SandboxError::ContainerFailed { .. })
        ));
    }

    #[test]
    fn test_create_error_maps_missing_image() {
        let missing = create_error(
            DockerError::DockerResponseServerError {
                status_code: 404,
                message: "No such image".to_string(),
            },
            "quay.io/edvakf/r-ggplot2",
        );
        assert!(matches!(
            missing,
            SandboxError::ImageNotFound { ref image } if image == "quay.io/edvakf/r-ggplot2"
        ));

        let conflict = create_error(
            DockerError::DockerResponseServerError {
                status_code: 409,
                message: "name in use".to_string(),
            },
            "img",
        );
        assert!(matches!(conflict, SandboxError::ContainerFailed { .. }));
    }

    #[test]
    fn test_container_config_rejects_bad_resources() {
        let sandbox = DockerSandbox::new(SandboxConfig {
            resources: ResourceConfig {
                memory: "huge".to_string(),
                cpus: "1".to_string(),
            },
            ..Default::default()
        });
        assert!(sandbox
            .build_container_config("/tmp/x", None, Duration::from_secs(1))
            .is_err());
    }
}
