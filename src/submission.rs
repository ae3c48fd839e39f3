//! Caller submissions: code plus named auxiliary files.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::ValidationError;

/// Longest accepted file name.
pub(crate) const MAX_FILE_NAME_LEN: usize = 64;

static FILE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[0-9A-Za-z_]+$").expect("file name pattern is valid"));

/// Code plus named files to execute together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Submission {
    pub code: String,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl Submission {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            files: BTreeMap::new(),
        }
    }

    /// Adds or replaces a file.
    #[cfg(test)]
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(name.into(), content.into());
        self
    }

    /// Checks the code and every file name before any work is done.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::EmptyCode);
        }
        validate_file_names(self.files.keys().map(String::as_str))
    }
}

/// Validates a single file name against `[0-9A-Za-z_]+`.
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyFileName);
    }
    if name.len() > MAX_FILE_NAME_LEN {
        return Err(ValidationError::FileNameTooLong {
            name: name.to_string(),
            max: MAX_FILE_NAME_LEN,
        });
    }
    if !FILE_NAME_RE.is_match(name) {
        return Err(ValidationError::invalid_file_name(name));
    }
    Ok(())
}

pub fn validate_file_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    names.into_iter().try_for_each(validate_file_name)
}
