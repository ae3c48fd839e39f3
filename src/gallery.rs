//! Gallery operations: execute-and-keep, look up, replot, re-render.

use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::engine::{Artifact, Engine, Execution};
use crate::error::EngineError;
use crate::program::RenderOptions;
use crate::store::{ArtifactStore, StoredPlot};
use crate::submission::{validate_file_names, Submission};

/// Execution plus the id it was stored under, if it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotResult {
    pub execution: Execution,
    pub id: Option<String>,
}

/// Engine and store wired together.
pub(crate) struct Gallery {
    engine: Engine,
    store: ArtifactStore,
}

impl Gallery {
    pub fn new(engine: Engine, store: ArtifactStore) -> Self {
        Self { engine, store }
    }

    /// Executes a submission and stores it if, and only if, it rendered.
    pub async fn plot(
        &self,
        submission: &Submission,
        options: &RenderOptions,
    ) -> Result<PlotResult, EngineError> {
        let execution = self.engine.execute(submission, options).await?;
        if !execution.is_success() {
            return Ok(PlotResult {
                execution,
                id: None,
            });
        }

        let id = self.store.persist(submission)?;
        Ok(PlotResult {
            execution,
            id: Some(id),
        })
    }

    /// Looks up a stored plot.
    pub fn show(&self, id: &str) -> Result<StoredPlot, EngineError> {
        Ok(self.store.fetch(id)?)
    }

    /// Re-executes a stored plot with some of its files replaced and stores
    /// the result under a new id.
    pub async fn replot(
        &self,
        id: &str,
        overrides: &BTreeMap<String, String>,
        options: &RenderOptions,
    ) -> Result<PlotResult, EngineError> {
        validate_file_names(overrides.keys().map(String::as_str))?;
        let submission = self.store.replay(id, overrides)?;

        let result = self.plot(&submission, options).await?;
        if let Some(ref new_id) = result.id {
            info!("Replotted {} as {}", id, new_id);
        }
        Ok(result)
    }

    /// Renders a stored plot again with different options.
    ///
    /// The code ran successfully when it was stored, so anything short of
    /// success now is a server fault.
    pub async fn render(&self, id: &str, options: &RenderOptions) -> Result<Artifact, EngineError> {
        let submission = self.store.retrieve(id)?;
        let execution = self.engine.execute(&submission, options).await?;

        match execution.artifact {
            Some(artifact) if execution.is_success() => Ok(artifact),
            _ => {
                warn!(
                    "Stored plot {} no longer renders ({}): {}",
                    id, execution.classification, execution.output
                );
                Err(EngineError::StoredPlotFailed {
                    id: id.to_string(),
                    classification: execution.classification,
                })
            }
        }
    }
}
