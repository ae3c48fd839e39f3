//! Domain-specific error types for sandbox operations.
//!
//! Every variant except `Timeout` means the sandbox infrastructure failed;
//! the program itself never got a fair run.

use std::time::Duration;

/// Errors that can occur during sandbox operations.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Docker daemon is not running or not accessible.
    #[error("Docker is not available: {message}")]
    DockerUnavailable { message: String },

    /// Container image was not found.
    #[error("Container image not found: {image}")]
    ImageNotFound { image: String },

    /// The host gave up waiting after the in-container watchdog failed to fire.
    #[error("Container execution timed out after {timeout_secs} seconds")]
    Timeout {
        timeout_secs: u64,
        /// Whatever the program printed before it was killed.
        output: String,
    },

    /// Container operation failed (create, start, wait, logs).
    #[error("Container operation failed: {message}")]
    ContainerFailed { message: String },

    /// The configured sandbox command could not be built.
    #[error("Invalid sandbox command: {message}")]
    InvalidCommand { message: String },
}

impl SandboxError {
    /// Creates a `DockerUnavailable` error.
    pub fn docker_unavailable(message: impl Into<String>) -> Self {
        Self::DockerUnavailable {
            message: message.into(),
        }
    }

    /// Creates an `ImageNotFound` error.
    pub fn image_not_found(image: impl Into<String>) -> Self {
        Self::ImageNotFound {
            image: image.into(),
        }
    }

    /// Creates a `Timeout` error from a `Duration` and the captured output.
    pub fn timeout(duration: Duration, output: impl Into<String>) -> Self {
        Self::Timeout {
            timeout_secs: duration.as_secs(),
            output: output.into(),
        }
    }

    /// Creates a `ContainerFailed` error.
    pub fn container_failed(message: impl Into<String>) -> Self {
        Self::ContainerFailed {
            message: message.into(),
        }
    }

    /// Creates an `InvalidCommand` error.
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            message: message.into(),
        }
    }
}
