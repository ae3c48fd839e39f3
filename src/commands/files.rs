//! Reading submissions from disk and writing artifacts back.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::engine::Artifact;
use crate::submission::Submission;

/// Source argument that means "read from stdin".
const STDIN_SOURCE: &str = "-";

/// A `--file NAME=PATH` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileArg {
    /// Name the file is staged under.
    pub name: String,
    /// Where its content is read from.
    pub path: PathBuf,
}

/// Parses `NAME=PATH`. The name is checked later, with the rest of the
/// submission.
pub(crate) fn parse_file_arg(arg: &str) -> Result<FileArg, String> {
    let (name, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{arg}'"))?;
    if path.is_empty() {
        return Err(format!("missing path for '{name}'"));
    }
    Ok(FileArg {
        name: name.to_string(),
        path: PathBuf::from(path),
    })
}

/// Reads program code from `source`, or from `stdin` when `source` is `-`.
pub(crate) fn read_code(source: &str, mut stdin: impl Read) -> Result<String> {
    if source == STDIN_SOURCE {
        let mut code = String::new();
        stdin
            .read_to_string(&mut code)
            .context("Failed to read code from stdin")?;
        return Ok(code);
    }
    fs::read_to_string(source).with_context(|| format!("Failed to read code from {source}"))
}

/// Reads the content of every `--file` argument.
pub(crate) fn read_files(args: &[FileArg]) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    for arg in args {
        if files.contains_key(&arg.name) {
            bail!("File '{}' given more than once", arg.name);
        }
        let content = fs::read_to_string(&arg.path)
            .with_context(|| format!("Failed to read {}", arg.path.display()))?;
        files.insert(arg.name.clone(), content);
    }
    Ok(files)
}

/// Builds a submission from a code source and `--file` arguments.
pub(crate) fn load_submission(source: &str, args: &[FileArg]) -> Result<Submission> {
    Ok(Submission {
        code: read_code(source, std::io::stdin().lock())?,
        files: read_files(args)?,
    })
}

/// Where an artifact goes: `out` if given, else `<stem>.<ext>` in the
/// current directory.
pub(crate) fn artifact_path(out: Option<&Path>, stem: &str, artifact: &Artifact) -> PathBuf {
    out.map_or_else(
        || PathBuf::from(format!("{stem}.{}", artifact.format.extension())),
        Path::to_path_buf,
    )
}

pub(crate) fn write_artifact(path: &Path, artifact: &Artifact) -> Result<()> {
    fs::write(path, &artifact.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))
}
