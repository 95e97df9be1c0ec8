//! Storage backend for experiment tracking
//!
//! Layout under the tracking root:
//!
//! ```text
//! <root>/<experiment_id>/meta.json
//! <root>/<experiment_id>/<run_id>/run.json
//! <root>/<experiment_id>/<run_id>/artifacts/<path>
//! ```

use super::tracker::{Experiment, Run};
use crate::error::{Result, WineError};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

const EXPERIMENT_META: &str = "meta.json";
const RUN_META: &str = "run.json";
const ARTIFACTS_DIR: &str = "artifacts";

/// Storage backend trait
pub trait StorageBackend {
    fn save_experiment(&self, experiment: &Experiment) -> Result<()>;

    fn load_experiment(&self, experiment_id: &str) -> Result<Option<Experiment>>;

    fn save_run(&self, run: &Run) -> Result<()>;

    fn load_run(&self, experiment_id: &str, run_id: &str) -> Result<Run>;

    /// All readable runs of an experiment, in no particular order
    fn list_runs(&self, experiment_id: &str) -> Result<Vec<Run>>;

    /// Store bytes under a run's artifact directory and return the stored path
    fn write_artifact(
        &self,
        experiment_id: &str,
        run_id: &str,
        artifact_path: &str,
        bytes: &[u8],
    ) -> Result<PathBuf>;

    fn read_artifact(&self, experiment_id: &str, run_id: &str, artifact_path: &str) -> Result<Vec<u8>>;
}

/// Local file system storage backend
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn experiment_dir(&self, experiment_id: &str) -> PathBuf {
        self.base_dir.join(experiment_id)
    }

    fn run_dir(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.experiment_dir(experiment_id).join(run_id)
    }

    /// Resolve an artifact path, refusing anything that would escape the artifact directory.
    pub fn artifact_file(&self, experiment_id: &str, run_id: &str, artifact_path: &str) -> Result<PathBuf> {
        let relative = Path::new(artifact_path);
        let is_plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if artifact_path.is_empty() || !is_plain {
            return Err(WineError::TrackingError(format!(
                "invalid artifact path '{}'",
                artifact_path
            )));
        }
        Ok(self
            .run_dir(experiment_id, run_id)
            .join(ARTIFACTS_DIR)
            .join(relative))
    }
}

impl StorageBackend for LocalStorage {
    fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
        let dir = self.experiment_dir(&experiment.experiment_id);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(experiment)?;
        fs::write(dir.join(EXPERIMENT_META), json)?;
        Ok(())
    }

    fn load_experiment(&self, experiment_id: &str) -> Result<Option<Experiment>> {
        let path = self.experiment_dir(experiment_id).join(EXPERIMENT_META);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn save_run(&self, run: &Run) -> Result<()> {
        let dir = self.run_dir(&run.experiment_id, &run.run_id);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(run)?;
        fs::write(dir.join(RUN_META), json)?;
        Ok(())
    }

    fn load_run(&self, experiment_id: &str, run_id: &str) -> Result<Run> {
        let path = self.run_dir(experiment_id, run_id).join(RUN_META);
        if !path.exists() {
            return Err(WineError::TrackingError(format!(
                "run '{}' not found in experiment '{}'",
                run_id, experiment_id
            )));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn list_runs(&self, experiment_id: &str) -> Result<Vec<Run>> {
        let dir = self.experiment_dir(experiment_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path().join(RUN_META);
            if !path.is_file() {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(WineError::from)
                .and_then(|json| serde_json::from_str::<Run>(&json).map_err(WineError::from));
            match parsed {
                Ok(run) => runs.push(run),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable run"),
            }
        }
        Ok(runs)
    }

    fn write_artifact(
        &self,
        experiment_id: &str,
        run_id: &str,
        artifact_path: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let target = self.artifact_file(experiment_id, run_id, artifact_path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes)?;
        Ok(target)
    }

    fn read_artifact(&self, experiment_id: &str, run_id: &str, artifact_path: &str) -> Result<Vec<u8>> {
        let path = self.artifact_file(experiment_id, run_id, artifact_path)?;
        Ok(fs::read(path)?)
    }
}
