//! Staging inputs and assembling the program entry point.
//!
//! Caller code is copied verbatim between a fixed prologue and a generated
//! save directive. Nothing here escapes or inspects the code; isolation is
//! the sandbox's job.

use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use tracing::debug;

use crate::error::{EngineError, ValidationError};
use crate::submission::validate_file_name;
use crate::workspace::{Workspace, WorkspaceError};

/// Entry point file the interpreter is pointed at.
pub(crate) const ENTRY_FILE: &str = "program.R";

/// Prologue loading the rendering library.
const PROLOGUE: &str = "library(ggplot2)";

/// Stem of the artifact file the save directive writes.
const ARTIFACT_STEM: &str = "img";

pub(crate) const MAX_DPI: u32 = 1200;
pub(crate) const MAX_INCHES: f64 = 50.0;

/// Smallest size the save directive can print with two decimals.
pub(crate) const MIN_INCHES: f64 = 0.01;

/// Output image format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Vector output (SVG).
    #[default]
    #[serde(alias = "vector")]
    #[value(alias = "vector")]
    Svg,
    /// Raster output (PNG).
    #[serde(alias = "raster")]
    #[value(alias = "raster")]
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml",
            Self::Png => "image/png",
        }
    }

    /// Name of the artifact produced for this format.
    pub fn artifact_name(self) -> String {
        format!("{ARTIFACT_STEM}.{}", self.extension())
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// How the artifact is saved.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderOptions {
    #[serde(default)]
    pub format: ImageFormat,

    #[serde(default = "default_dpi")]
    pub dpi: u32,

    /// Width in inches.
    #[serde(default = "default_inches")]
    pub width: f64,

    /// Height in inches.
    #[serde(default = "default_inches")]
    pub height: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::default(),
            dpi: default_dpi(),
            width: default_inches(),
            height: default_inches(),
        }
    }
}

fn default_dpi() -> u32 {
    72
}

fn default_inches() -> f64 {
    8.0
}

impl RenderOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.dpi == 0 || self.dpi > MAX_DPI {
            return Err(ValidationError::InvalidDpi {
                value: self.dpi,
                max: MAX_DPI,
            });
        }
        check_inches("width", self.width)?;
        check_inches("height", self.height)
    }

    pub fn artifact_name(&self) -> String {
        self.format.artifact_name()
    }
}

fn check_inches(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (MIN_INCHES..=MAX_INCHES).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDimension {
            field,
            value,
            min: MIN_INCHES,
            max: MAX_INCHES,
        })
    }
}

/// Writes one named input file into the workspace root.
///
/// The name is validated before anything touches the filesystem. Existing
/// files are truncated, not appended to.
pub(crate) fn stage_file(ws: &Workspace, name: &str, content: &str) -> Result<(), EngineError> {
    validate_file_name(name)?;

    let path = ws.file(name);
    fs::write(&path, content).map_err(|e| WorkspaceError::io(&path, e))?;
    debug!("Staged {} ({} bytes)", name, content.len());
    Ok(())
}

/// Assembles the program text for the given code and options.
pub(crate) fn program_source(code: &str, options: &RenderOptions) -> String {
    let save = format!(
        r#"ggsave(file="{}", dpi={}, width={:.2}, height={:.2})"#,
        options.artifact_name(),
        options.dpi,
        options.width,
        options.height,
    );
    [PROLOGUE, code, save.as_str()].join("\n")
}

/// Writes the program entry point into the workspace.
pub(crate) fn synthesize(
    ws: &Workspace,
    code: &str,
    options: &RenderOptions,
) -> Result<(), EngineError> {
    options.validate()?;

    let path = ws.file(ENTRY_FILE);
    fs::write(&path, program_source(code, options)).map_err(|e| WorkspaceError::io(&path, e))?;
    debug!("Wrote {} for {} output", ENTRY_FILE, options.format);
    Ok(())
}
