//! Execute code and keep it in the gallery if it renders.

use anyhow::Result;
use std::path::Path;
use std::process::ExitCode;

use super::files::{self, FileArg};
use super::{exit_code, format, setup, RenderArgs};
use crate::config::Config;
use crate::gallery::PlotResult;

/// Runs the `plot` command.
pub(crate) async fn run(
    config: &Config,
    source: &str,
    file_args: &[FileArg],
    render: &RenderArgs,
    out: Option<&Path>,
) -> Result<ExitCode> {
    let submission = files::load_submission(source, file_args)?;
    let options = render.apply(config.render);

    let gallery = setup::gallery(config)?;
    let result = gallery.plot(&submission, &options).await?;
    report(&result, out)
}

/// Prints a plot result and writes its artifact. Shared with `replot`.
pub(crate) fn report(result: &PlotResult, out: Option<&Path>) -> Result<ExitCode> {
    let execution = &result.execution;
    print!("{}", format::format_execution(execution));

    if let (Some(id), Some(artifact)) = (&result.id, &execution.artifact) {
        print!("{}", format::format_stored(id));
        let path = files::artifact_path(out, id, artifact);
        files::write_artifact(&path, artifact)?;
        print!("{}", format::format_saved(&path, artifact));
    }

    Ok(exit_code(execution.classification))
}
