//! Error taxonomy for the execution engine.
//!
//! Caller faults (`ValidationError`, `NotFound`) carry detail back to the
//! caller. Server faults (storage, workspace, sandbox launch) are logged in
//! full and surfaced with a generic message only.

use crate::outcome::Classification;
use crate::sandbox::SandboxError;
use crate::store::StoreError;
use crate::workspace::WorkspaceError;

/// Caller input that was rejected before any sandbox or storage work.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// File name is empty.
    #[error("File name cannot be empty")]
    EmptyFileName,

    /// File name exceeds the maximum length.
    #[error("File name '{name}' is longer than {max} characters")]
    FileNameTooLong { name: String, max: usize },

    /// File name contains characters outside `[0-9A-Za-z_]`.
    #[error("File name '{name}' can contain only characters in [0-9a-zA-Z_]")]
    InvalidFileName { name: String },

    /// Override names a file the stored submission never declared.
    #[error("File name '{name}' must match that of the original plot")]
    UnknownFileName { name: String },

    /// Code is blank.
    #[error("Cannot execute empty code")]
    EmptyCode,

    /// DPI is outside the accepted range.
    #[error("DPI must be between 1 and {max}, got {value}")]
    InvalidDpi { value: u32, max: u32 },

    /// Width or height is not a finite size in inches within bounds.
    #[error("{field} must be between {min} and {max} inches, got {value}")]
    InvalidDimension {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl ValidationError {
    /// Creates an `InvalidFileName` error.
    pub fn invalid_file_name(name: impl Into<String>) -> Self {
        Self::InvalidFileName { name: name.into() }
    }

    /// Creates an `UnknownFileName` error.
    pub fn unknown_file_name(name: impl Into<String>) -> Self {
        Self::UnknownFileName { name: name.into() }
    }
}

/// Errors returned by the engine and the gallery operations built on it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Caller supplied invalid input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No stored submission has this id.
    #[error("Plot not found: {id}")]
    NotFound { id: String },

    /// Persistence failed.
    #[error("Storage failure: {0}")]
    Storage(StoreError),

    /// A workspace could not be created or removed.
    #[error("Workspace failure: {0}")]
    Resource(#[from] WorkspaceError),

    /// The sandbox could not be launched.
    #[error("Sandbox failure: {0}")]
    Infra(#[from] SandboxError),

    /// A stored plot, which ran successfully when it was saved, failed to
    /// render again.
    #[error("Stored plot {id} failed to render: {classification}")]
    StoredPlotFailed {
        id: String,
        classification: Classification,
    },
}

impl EngineError {
    /// Returns true if the error is the server's fault rather than the caller's.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Resource(_) | Self::Infra(_) | Self::StoredPlotFailed { .. }
        )
    }

    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        if self.is_server_fault() {
            "Internal error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => Self::NotFound { id },
            StoreError::UnknownFileName { name } => {
                Self::Validation(ValidationError::unknown_file_name(name))
            }
            other => Self::Storage(other),
        }
    }
}
