//! Re-execute a stored plot with some files replaced.

use anyhow::Result;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

use super::files::{self, FileArg};
use super::{check_id, plot, setup, RenderArgs};
use crate::config::Config;

/// Runs the `replot` command.
pub(crate) async fn run(
    config: &Config,
    id: &str,
    file_args: &[FileArg],
    render: &RenderArgs,
    out: Option<&Path>,
) -> Result<ExitCode> {
    check_id(id)?;
    let overrides = files::read_files(file_args)?;
    let options = render.apply(config.render);
    info!("Replotting {} with {} replaced file(s)", id, overrides.len());

    let gallery = setup::gallery(config)?;
    let result = gallery.replot(id, &overrides, &options).await?;
    plot::report(&result, out)
}
