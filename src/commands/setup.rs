//! Wiring config into an engine and a gallery.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::config::{Config, StorageConfig};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::gallery::Gallery;
use crate::sandbox::DockerSandbox;
use crate::store::ArtifactStore;
use crate::workspace::WorkspaceManager;

/// Global flags that override the config file.
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub tmpdir: Option<PathBuf>,
}

/// Loads the config from the working directory and applies `overrides`.
pub(crate) fn load_config(overrides: &Overrides) -> Result<Config> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = Config::load(&cwd, overrides.config.as_deref())?;
    Ok(apply_overrides(config, overrides))
}

fn apply_overrides(mut config: Config, overrides: &Overrides) -> Config {
    if let Some(ref db) = overrides.db {
        config.storage.path = Some(db.clone());
    }
    if let Some(ref tmpdir) = overrides.tmpdir {
        config.workspace.base_dir = Some(tmpdir.clone());
    }
    config
}

/// Builds an engine backed by Docker.
pub(crate) fn engine(config: &Config) -> Engine {
    let base = config.workspace.base_dir();
    debug!(
        "Workspaces in {}, image {}",
        base.display(),
        config.sandbox.image
    );
    Engine::new(
        WorkspaceManager::new(base),
        Arc::new(DockerSandbox::new(config.sandbox.clone())),
        config.sandbox.timeout(),
        config.sandbox.max_concurrent,
    )
}

/// Builds a gallery, opening (and if needed creating) the store.
pub(crate) fn gallery(config: &Config) -> Result<Gallery> {
    let store = open_store(&config.storage)?;
    Ok(Gallery::new(engine(config), store))
}

fn open_store(storage: &StorageConfig) -> Result<ArtifactStore, EngineError> {
    let path = storage.path()?;
    debug!("Opening store {}", path.display());
    Ok(ArtifactStore::open(&path)?)
}
