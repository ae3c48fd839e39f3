//! Show a stored plot.

use anyhow::{Context, Result};

use super::{check_id, format, setup};
use crate::config::Config;

/// Runs the `show` command.
pub(crate) fn run(config: &Config, id: &str, json: bool) -> Result<()> {
    check_id(id)?;
    let plot = setup::gallery(config)?.show(id)?;

    if json {
        let text = serde_json::to_string_pretty(&format::stored_plot_json(&plot))
            .context("Failed to serialize plot")?;
        println!("{text}");
    } else {
        print!("{}", format::format_stored_plot(&plot));
    }
    Ok(())
}
