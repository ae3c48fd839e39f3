use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::program::RenderOptions;
use crate::store::StoreError;

pub(crate) const CONFIG_FILE: &str = "plotbox.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub render: RenderOptions,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Sandbox configuration - the container that runs submitted code
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    /// Docker image with the interpreter and rendering library installed
    #[serde(default = "default_image")]
    pub image: String,

    /// Interpreter invocation; the entry file is appended
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Wall-clock budget per execution, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of sandboxes running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Resource limits
    #[serde(default)]
    pub resources: ResourceConfig,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            interpreter: default_interpreter(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
            resources: ResourceConfig::default(),
        }
    }
}

impl SandboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    /// Memory limit (e.g., "1g")
    #[serde(default = "default_memory")]
    pub memory: String,

    /// CPU limit (e.g., "1", "0.5")
    #[serde(default = "default_cpus")]
    pub cpus: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            memory: default_memory(),
            cpus: default_cpus(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory workspaces are created in. Must be mountable by Docker.
    /// Defaults to the system temp directory.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

impl WorkspaceConfig {
    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path. Defaults to `<data dir>/plotbox/plotbox.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn path(&self) -> Result<PathBuf, StoreError> {
        self.resolve(dirs::data_dir())
    }

    pub(crate) fn resolve(&self, data_dir: Option<PathBuf>) -> Result<PathBuf, StoreError> {
        if let Some(ref path) = self.path {
            return Ok(path.clone());
        }
        let data_dir = data_dir.ok_or(StoreError::NoDataDir)?;
        Ok(data_dir.join("plotbox").join("plotbox.db"))
    }
}

// Default value functions
fn default_image() -> String {
    "quay.io/edvakf/r-ggplot2".to_string()
}

fn default_interpreter() -> String {
    "R --vanilla --quiet -f".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent() -> usize {
    2
}

fn default_memory() -> String {
    "1g".to_string()
}

fn default_cpus() -> String {
    "1".to_string()
}

impl Config {
    /// Load configuration from `path`, or `plotbox.toml` in `dir` when no
    /// path is given. A missing default file yields the defaults.
    pub fn load(dir: &Path, path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = dir.join(CONFIG_FILE);
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.render.validate().with_context(|| {
            format!("Invalid [render] section in {}", config_path.display())
        })?;

        Ok(config)
    }
}
