//! CLI command implementations.
//!
//! Each submodule implements one plotbox command. Parsing and formatting are
//! kept apart from IO so they can be tested without a container runtime.

use clap::Args;
use std::process::ExitCode;

use crate::error::EngineError;
use crate::outcome::Classification;
use crate::program::{ImageFormat, RenderOptions};
use crate::store::is_plot_id;

pub mod files;
pub mod format;
pub mod init;
pub mod plot;
pub mod render;
pub mod replot;
pub mod run;
pub mod setup;
pub mod show;

/// Exit status when the program ran but did not render.
pub(crate) const EXIT_NOT_RENDERED: u8 = 1;
/// Exit status for rejected input, unknown ids and local IO problems.
pub(crate) const EXIT_CALLER_ERROR: u8 = 2;
/// Exit status for server faults.
pub(crate) const EXIT_INTERNAL_ERROR: u8 = 3;

/// Render flags that override the `[render]` config section.
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct RenderArgs {
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<ImageFormat>,

    /// Resolution in dots per inch
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Width in inches
    #[arg(long)]
    pub width: Option<f64>,

    /// Height in inches
    #[arg(long)]
    pub height: Option<f64>,
}

impl RenderArgs {
    /// Applies the flags that were given on top of `base`.
    pub fn apply(&self, base: RenderOptions) -> RenderOptions {
        RenderOptions {
            format: self.format.unwrap_or(base.format),
            dpi: self.dpi.unwrap_or(base.dpi),
            width: self.width.unwrap_or(base.width),
            height: self.height.unwrap_or(base.height),
        }
    }
}

/// Exit status for a finished execution.
pub(crate) fn exit_code(classification: Classification) -> ExitCode {
    match classification {
        Classification::Success => ExitCode::SUCCESS,
        Classification::ProgramFailure | Classification::Timeout => {
            ExitCode::from(EXIT_NOT_RENDERED)
        }
        Classification::InfraFailure => ExitCode::from(EXIT_INTERNAL_ERROR),
    }
}

/// Rejects ids that could never have been generated, without a lookup.
pub(crate) fn check_id(id: &str) -> Result<(), EngineError> {
    if is_plot_id(id) {
        Ok(())
    } else {
        Err(EngineError::NotFound { id: id.to_string() })
    }
}
