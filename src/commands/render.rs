//! Render a stored plot again, possibly in another format or size.

use anyhow::Result;
use std::path::Path;

use super::{check_id, files, format, setup, RenderArgs};
use crate::config::Config;

/// Runs the `render` command.
pub(crate) async fn run(
    config: &Config,
    id: &str,
    render: &RenderArgs,
    out: Option<&Path>,
) -> Result<()> {
    check_id(id)?;
    let options = render.apply(config.render);

    let gallery = setup::gallery(config)?;
    let artifact = gallery.render(id, &options).await?;

    let path = files::artifact_path(out, id, &artifact);
    files::write_artifact(&path, &artifact)?;
    print!("{}", format::format_saved(&path, &artifact));
    Ok(())
}
