use std::path::PathBuf;

/// Errors from the artifact store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No code record has this id.
    #[error("No plot with id '{id}'")]
    NotFound { id: String },

    /// A replay override names a file the stored plot does not have.
    #[error("Unknown file name '{name}'")]
    UnknownFileName { name: String },

    /// Every generated id collided with an existing one.
    #[error("Could not allocate a unique id after {attempts} attempts")]
    IdSpaceExhausted { attempts: u32 },

    /// No database path was configured and the platform has no data directory.
    #[error("Could not determine data directory for the default database")]
    NoDataDir,

    /// The database directory could not be created.
    #[error("Failed to create storage directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Another thread panicked while holding the connection.
    #[error("Storage connection lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}
