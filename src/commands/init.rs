//! Write a default `plotbox.toml` into the current directory.
//!
//! The core logic takes closures for filesystem access so it can be tested
//! without touching disk.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::CONFIG_FILE;
use crate::templates;

// -----------------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------------

/// Runs the init command.
pub(crate) fn run(force: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    info!("Initializing plotbox in {}", cwd.display());

    let result = init_config(
        Path::new(CONFIG_FILE),
        templates::PLOTBOX_TOML,
        force,
        |path| cwd.join(path).exists(),
        |path, content| {
            fs::write(cwd.join(path), content)
                .with_context(|| format!("Failed to write {}", path.display()))
        },
    )?;

    print!("{}", format_result(Path::new(CONFIG_FILE), result));

    Ok(())
}

// -----------------------------------------------------------------------------
// Internal types
// -----------------------------------------------------------------------------

/// Result of attempting to write the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteResult {
    Created,
    Overwritten,
    /// Already exists and `--force` was not given.
    Skipped,
}

// -----------------------------------------------------------------------------
// Helper functions
// -----------------------------------------------------------------------------

fn init_config<E, W>(
    path: &Path,
    content: &str,
    force: bool,
    exists: E,
    mut write_file: W,
) -> Result<WriteResult>
where
    E: Fn(&Path) -> bool,
    W: FnMut(&Path, &str) -> Result<()>,
{
    let existed = exists(path);
    if existed && !force {
        return Ok(WriteResult::Skipped);
    }

    write_file(path, content)?;
    Ok(if existed {
        WriteResult::Overwritten
    } else {
        WriteResult::Created
    })
}

/// Formats the init result for display with colored output.
fn format_result(path: &Path, result: WriteResult) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    match result {
        WriteResult::Created => {
            writeln!(
                &mut out,
                "\n{} Created {}",
                "✓".green().bold(),
                path.display().to_string().cyan()
            )
            .unwrap();
        }
        WriteResult::Overwritten => {
            writeln!(
                &mut out,
                "\n{} {} (overwritten)",
                "↻".blue(),
                path.display().to_string().cyan()
            )
            .unwrap();
        }
        WriteResult::Skipped => {
            writeln!(
                &mut out,
                "\n{} {} (already exists, use --force to overwrite)",
                "⊘".yellow(),
                path.display()
            )
            .unwrap();
            return out;
        }
    }

    writeln!(&mut out, "\n{}", "Next steps:".yellow().bold()).unwrap();
    writeln!(
        &mut out,
        "  1. Edit {} to pick the image and limits",
        CONFIG_FILE.cyan()
    )
    .unwrap();
    writeln!(
        &mut out,
        "  2. Run {} to try it",
        "plotbox run plot.R".green()
    )
    .unwrap();
    writeln!(
        &mut out,
        "  3. Run {} to keep the result",
        "plotbox plot plot.R".green()
    )
    .unwrap();

    out
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
