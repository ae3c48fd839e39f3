//! Embedded templates.

/// Default `plotbox.toml` configuration.
pub(crate) const PLOTBOX_TOML: &str = include_str!("plotbox.toml");
