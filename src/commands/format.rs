//! Formatting functions for command output.
//!
//! Everything here returns a string; printing is left to the commands.

use colored::Colorize;
use std::fmt::Write;
use std::path::Path;

use crate::engine::{Artifact, Execution};
use crate::outcome::Classification;
use crate::store::StoredPlot;

/// Formats the result of an execution: a one-line verdict, followed by the
/// program output when it did not render.
pub(crate) fn format_execution(execution: &Execution) -> String {
    let mut out = String::new();

    match execution.classification {
        Classification::Success => {
            writeln!(&mut out, "{} Plot rendered", "✓".green().bold()).unwrap();
        }
        Classification::ProgramFailure => {
            writeln!(&mut out, "{} Program failed to execute", "✗".red().bold()).unwrap();
        }
        Classification::Timeout => {
            writeln!(
                &mut out,
                "{} Maximum execution time exceeded",
                "⏱".yellow().bold()
            )
            .unwrap();
        }
        // Engine reports these as errors, never as an Execution
        Classification::InfraFailure => {
            writeln!(&mut out, "{} Internal error", "✗".red().bold()).unwrap();
        }
    }

    if !execution.is_success() && !execution.output.trim().is_empty() {
        writeln!(&mut out, "{}", "━".repeat(50).dimmed()).unwrap();
        write!(&mut out, "{}", execution.output).unwrap();
        if !execution.output.ends_with('\n') {
            out.push('\n');
        }
        writeln!(&mut out, "{}", "━".repeat(50).dimmed()).unwrap();
    }

    out
}

/// Formats the line reporting where an artifact was written.
pub(crate) fn format_saved(path: &Path, artifact: &Artifact) -> String {
    format!(
        "  Saved {} ({}, {} bytes)\n",
        path.display().to_string().cyan(),
        artifact.format.mime_type(),
        artifact.bytes.len()
    )
}

/// Formats the id a plot was stored under.
pub(crate) fn format_stored(id: &str) -> String {
    format!("  Stored as {}\n", id.green().bold())
}

/// Formats a stored plot for display.
pub(crate) fn format_stored_plot(plot: &StoredPlot) -> String {
    let mut out = String::new();

    writeln!(&mut out, "\n{}", "━".repeat(50).dimmed()).unwrap();
    writeln!(&mut out, "  Plot:     {}", plot.id.cyan().bold()).unwrap();
    writeln!(
        &mut out,
        "  Created:  {}",
        plot.created_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
            .cyan()
    )
    .unwrap();

    if plot.submission.files.is_empty() {
        writeln!(&mut out, "  Files:    {}", "none".dimmed()).unwrap();
    } else {
        writeln!(&mut out, "  Files:").unwrap();
        for (name, content) in &plot.submission.files {
            writeln!(&mut out, "    {} ({} bytes)", name.cyan(), content.len()).unwrap();
        }
    }

    writeln!(&mut out, "{}", "━".repeat(50).dimmed()).unwrap();
    writeln!(&mut out, "{}", plot.submission.code).unwrap();

    out
}

/// Stored plot as JSON, for scripting.
pub(crate) fn stored_plot_json(plot: &StoredPlot) -> serde_json::Value {
    serde_json::json!({
        "id": plot.id,
        "created_at": plot.created_at.to_rfc3339(),
        "code": plot.submission.code,
        "files": plot.submission.files,
    })
}
