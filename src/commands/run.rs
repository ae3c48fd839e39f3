//! Execute code once without storing it.

use anyhow::Result;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

use super::files::{self, FileArg};
use super::{exit_code, format, setup, RenderArgs};
use crate::config::Config;

/// Runs the `run` command.
pub(crate) async fn run(
    config: &Config,
    source: &str,
    file_args: &[FileArg],
    render: &RenderArgs,
    out: Option<&Path>,
) -> Result<ExitCode> {
    let submission = files::load_submission(source, file_args)?;
    let options = render.apply(config.render);
    info!(
        "Executing {} bytes of code with {} file(s)",
        submission.code.len(),
        submission.files.len()
    );

    let execution = setup::engine(config).execute(&submission, &options).await?;
    print!("{}", format::format_execution(&execution));

    if let Some(ref artifact) = execution.artifact {
        let path = files::artifact_path(out, "plot", artifact);
        files::write_artifact(&path, artifact)?;
        print!("{}", format::format_saved(&path, artifact));
    }

    Ok(exit_code(execution.classification))
}
