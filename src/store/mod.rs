//! Persistent gallery of accepted submissions.
//!
//! Two tables: `plot` holds the code under a short random id, `file` holds
//! the named inputs that belong to it. A submission is written in one
//! transaction, so a plot row never exists without its files.

mod error;
mod ids;

pub use error::StoreError;
#[cfg(test)]
pub(crate) use ids::SequenceIds;
pub(crate) use ids::{is_plot_id, IdGenerator, RandomIds};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::submission::Submission;

/// Ids tried before giving up on a persist.
pub(crate) const MAX_ID_ATTEMPTS: u32 = 3;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS plot (
    id          TEXT PRIMARY KEY NOT NULL,
    created_at  TEXT NOT NULL,
    code        TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS file (
    plot_id  TEXT NOT NULL REFERENCES plot(id),
    name     TEXT NOT NULL,
    content  TEXT NOT NULL,
    PRIMARY KEY (plot_id, name)
);
";

/// A submission as it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredPlot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub submission: Submission,
}

/// SQLite-backed store of plots and their files.
pub(crate) struct ArtifactStore {
    conn: Mutex<Connection>,
    ids: Box<dyn IdGenerator>,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore").finish_non_exhaustive()
    }
}

impl ArtifactStore {
    /// Opens (and if needed creates) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        debug!("Opening store at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            ids: Box::new(RandomIds::default()),
        })
    }

    /// Replaces the id source.
    #[must_use]
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Stores a submission under a fresh id and returns the id.
    ///
    /// Only a primary-key collision triggers a new id; any other failure
    /// aborts the whole transaction.
    pub fn persist(&self, submission: &Submission) -> Result<String, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let id = insert_plot_tx(&tx, self.ids.as_ref(), &submission.code)?;
        for (name, content) in &submission.files {
            tx.execute(
                "INSERT INTO file (plot_id, name, content) VALUES (?1, ?2, ?3)",
                params![id, name, content],
            )?;
        }
        tx.commit()?;

        info!(
            "Stored plot {} with {} file(s)",
            id,
            submission.files.len()
        );
        Ok(id)
    }

    /// Loads a stored plot with its metadata.
    pub fn fetch(&self, id: &str) -> Result<StoredPlot, StoreError> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT created_at, code FROM plot WHERE id = ?1",
                params![id],
                |r| Ok((r.get::<_, DateTime<Utc>>(0)?, r.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((created_at, code)) = row else {
            return Err(StoreError::NotFound { id: id.to_string() });
        };

        let mut stmt = conn.prepare("SELECT name, content FROM file WHERE plot_id = ?1")?;
        let files = stmt
            .query_map(params![id], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(StoredPlot {
            id: id.to_string(),
            created_at,
            submission: Submission { code, files },
        })
    }

    /// Loads the code and files of a stored plot.
    pub fn retrieve(&self, id: &str) -> Result<Submission, StoreError> {
        self.fetch(id).map(|plot| plot.submission)
    }

    /// Loads a stored plot and swaps in new contents for existing files.
    ///
    /// Overrides may only name files the plot already has.
    pub fn replay(
        &self,
        id: &str,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Submission, StoreError> {
        let mut submission = self.retrieve(id)?;
        for (name, content) in overrides {
            let Some(slot) = submission.files.get_mut(name) else {
                return Err(StoreError::UnknownFileName { name: name.clone() });
            };
            slot.clone_from(content);
        }
        Ok(submission)
    }
}

fn insert_plot_tx(
    tx: &Transaction<'_>,
    ids: &dyn IdGenerator,
    code: &str,
) -> Result<String, StoreError> {
    for attempt in 1..=MAX_ID_ATTEMPTS {
        let id = ids.generate();
        match tx.execute(
            "INSERT INTO plot (id, created_at, code) VALUES (?1, ?2, ?3)",
            params![id, Utc::now(), code],
        ) {
            Ok(_) => return Ok(id),
            Err(e) if is_duplicate_key(&e) => {
                warn!(
                    "Plot id {} already taken (attempt {}/{})",
                    id, attempt, MAX_ID_ATTEMPTS
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(StoreError::IdSpaceExhausted {
        attempts: MAX_ID_ATTEMPTS,
    })
}

fn is_duplicate_key(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
