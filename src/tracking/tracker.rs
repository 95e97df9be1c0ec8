//! Experiment tracker implementation
//!
//! Track experiments, runs, parameters, metrics and artifacts on the local
//! file system. Every change to the active run is written through to
//! `run.json` immediately, so a crashed process still leaves a readable run.

use super::storage::{LocalStorage, StorageBackend};
use crate::error::{Result, WineError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// Artifact path under which models are logged
pub const MODEL_ARTIFACT: &str = "model/model.json";

/// A single metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub value: f64,
    pub step: u64,
    pub timestamp: DateTime<Utc>,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    /// Ended because another run was started while it was active
    Killed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Running => "running",
            RunStatus::Finished => "finished",
            RunStatus::Failed => "failed",
            RunStatus::Killed => "killed",
        };
        write!(f, "{}", s)
    }
}

/// A run within an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub experiment_id: String,
    pub run_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Creation order inside the experiment, breaks start_time ties
    pub sequence: u64,
    pub status: RunStatus,
    pub params: BTreeMap<String, String>,
    /// Latest value per metric key
    pub metrics: BTreeMap<String, f64>,
    pub metrics_history: Vec<Metric>,
    pub tags: BTreeMap<String, String>,
    /// Artifact paths relative to the run's artifact directory
    pub artifacts: Vec<String>,
}

impl Run {
    fn new(experiment_id: &str, run_name: &str, sequence: u64) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().simple().to_string(),
            experiment_id: experiment_id.to_string(),
            run_name: run_name.to_string(),
            start_time: Utc::now(),
            end_time: None,
            sequence,
            status: RunStatus::Running,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            metrics_history: Vec::new(),
            tags: BTreeMap::new(),
            artifacts: Vec::new(),
        }
    }

    /// Whether a model was logged to this run
    pub fn has_model(&self) -> bool {
        self.artifacts.iter().any(|a| a == MODEL_ARTIFACT)
    }

    /// Run duration in seconds, up to now for a run still in progress
    pub fn duration_secs(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// Experiment metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Experiment tracker bound to one experiment
pub struct ExperimentTracker {
    storage: LocalStorage,
    experiment_id: String,
    active_run: RwLock<Option<Run>>,
}

impl std::fmt::Debug for ExperimentTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentTracker")
            .field("root", &self.storage.base_dir())
            .field("experiment_id", &self.experiment_id)
            .field("active_run", &self.active_run_id())
            .finish()
    }
}

impl ExperimentTracker {
    /// Create a tracker rooted at a directory
    pub fn with_dir(root: impl Into<PathBuf>, experiment_id: impl Into<String>) -> Self {
        Self {
            storage: LocalStorage::new(root),
            experiment_id: experiment_id.into(),
            active_run: RwLock::new(None),
        }
    }

    /// Create a tracker from a tracking URI.
    ///
    /// Accepts `file:<dir>`, `file://<dir>` or a bare directory path.
    /// Remote tracking servers are not supported.
    pub fn from_uri(uri: &str, experiment_id: impl Into<String>) -> Result<Self> {
        Ok(Self::with_dir(root_from_uri(uri)?, experiment_id))
    }

    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    pub fn root(&self) -> &Path {
        self.storage.base_dir()
    }

    /// Create the experiment's metadata if it does not exist yet.
    pub fn ensure_experiment(&self, name: &str) -> Result<Experiment> {
        if let Some(existing) = self.storage.load_experiment(&self.experiment_id)? {
            return Ok(existing);
        }
        let experiment = Experiment {
            experiment_id: self.experiment_id.clone(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.storage.save_experiment(&experiment)?;
        info!(experiment_id = %self.experiment_id, name, "Created experiment");
        Ok(experiment)
    }

    /// Start a new run. A run still active in this tracker is ended as killed first.
    pub fn start_run(&self, run_name: &str) -> Result<String> {
        if let Some(previous) = self.active_run_id() {
            warn!(run_id = %previous, "Ending active run before starting a new one");
            self.end_run(RunStatus::Killed)?;
        }

        let sequence = self
            .storage
            .list_runs(&self.experiment_id)?
            .iter()
            .map(|r| r.sequence + 1)
            .max()
            .unwrap_or(0);

        let run = Run::new(&self.experiment_id, run_name, sequence);
        self.storage.save_run(&run)?;
        let run_id = run.run_id.clone();
        info!(run_id = %run_id, run_name, experiment_id = %self.experiment_id, "Run started");

        *self.write_slot()? = Some(run);
        Ok(run_id)
    }

    /// Log a parameter
    pub fn log_param(&self, key: &str, value: impl ToString) -> Result<()> {
        self.update_active(|run| {
            run.params.insert(key.to_string(), value.to_string());
        })
    }

    /// Log a metric at step 0
    pub fn log_metric(&self, key: &str, value: f64) -> Result<()> {
        self.log_metric_at(key, value, 0)
    }

    pub fn log_metric_at(&self, key: &str, value: f64, step: u64) -> Result<()> {
        self.update_active(|run| {
            run.metrics.insert(key.to_string(), value);
            run.metrics_history.push(Metric {
                key: key.to_string(),
                value,
                step,
                timestamp: Utc::now(),
            });
        })
    }

    pub fn log_tag(&self, key: &str, value: impl ToString) -> Result<()> {
        self.update_active(|run| {
            run.tags.insert(key.to_string(), value.to_string());
        })
    }

    /// Copy a local file into the active run's artifacts, optionally under a sub-directory.
    /// Returns the artifact path relative to the run.
    pub fn log_artifact(&self, local_path: &Path, artifact_dir: Option<&str>) -> Result<String> {
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                WineError::TrackingError(format!("'{}' has no file name", local_path.display()))
            })?;
        let artifact_path = match artifact_dir {
            Some(dir) => format!("{}/{}", dir.trim_end_matches('/'), file_name),
            None => file_name.to_string(),
        };
        let bytes = std::fs::read(local_path)?;
        self.log_artifact_bytes(&artifact_path, &bytes)?;
        Ok(artifact_path)
    }

    /// Store raw bytes as an artifact of the active run.
    pub fn log_artifact_bytes(&self, artifact_path: &str, bytes: &[u8]) -> Result<PathBuf> {
        let run_id = self
            .active_run_id()
            .ok_or_else(|| WineError::TrackingError("no active run".to_string()))?;
        let stored = self
            .storage
            .write_artifact(&self.experiment_id, &run_id, artifact_path, bytes)?;
        self.update_active(|run| {
            if !run.artifacts.iter().any(|a| a == artifact_path) {
                run.artifacts.push(artifact_path.to_string());
            }
        })?;
        debug!(run_id = %run_id, artifact = artifact_path, "Logged artifact");
        Ok(stored)
    }

    /// Serialize a model as JSON into the active run under [`MODEL_ARTIFACT`].
    pub fn log_model<T: Serialize>(&self, model: &T) -> Result<PathBuf> {
        let json = serde_json::to_vec(model)?;
        self.log_artifact_bytes(MODEL_ARTIFACT, &json)
    }

    /// End the active run with the given status. Returns the ended run id, if any.
    pub fn end_run(&self, status: RunStatus) -> Result<Option<String>> {
        let finished = self.write_slot()?.take();
        match finished {
            Some(mut run) => {
                run.status = status;
                run.end_time = Some(Utc::now());
                self.storage.save_run(&run)?;
                info!(run_id = %run.run_id, status = %status, "Run ended");
                Ok(Some(run.run_id))
            }
            None => Ok(None),
        }
    }

    pub fn active_run_id(&self) -> Option<String> {
        self.active_run
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().map(|r| r.run_id.clone()))
    }

    /// Snapshot of the active run
    pub fn active_run(&self) -> Option<Run> {
        self.active_run.read().ok().and_then(|slot| slot.clone())
    }

    /// All runs of the experiment, most recently started first.
    pub fn search_runs(&self) -> Result<Vec<Run>> {
        let mut runs = self.storage.list_runs(&self.experiment_id)?;
        runs.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| b.sequence.cmp(&a.sequence))
        });
        Ok(runs)
    }

    /// Most recently started run
    pub fn latest_run(&self) -> Result<Option<Run>> {
        Ok(self.search_runs()?.into_iter().next())
    }

    /// Most recently started run that has a logged model
    pub fn latest_model_run(&self) -> Result<Option<Run>> {
        Ok(self.search_runs()?.into_iter().find(|r| r.has_model()))
    }

    pub fn get_run(&self, run_id: &str) -> Result<Run> {
        self.storage.load_run(&self.experiment_id, run_id)
    }

    /// Load the model logged to a run.
    pub fn load_model<T: DeserializeOwned>(&self, run_id: &str) -> Result<T> {
        let bytes = self
            .storage
            .read_artifact(&self.experiment_id, run_id, MODEL_ARTIFACT)
            .map_err(|e| WineError::ModelUnavailable(format!("run {}: {}", run_id, e)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Absolute location of a run's artifact
    pub fn artifact_path(&self, run_id: &str, artifact_path: &str) -> Result<PathBuf> {
        self.storage
            .artifact_file(&self.experiment_id, run_id, artifact_path)
    }

    fn write_slot(&self) -> Result<std::sync::RwLockWriteGuard<'_, Option<Run>>> {
        self.active_run
            .write()
            .map_err(|_| WineError::TrackingError("active run lock poisoned".to_string()))
    }

    fn update_active<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Run),
    {
        let mut slot = self.write_slot()?;
        let run = slot
            .as_mut()
            .ok_or_else(|| WineError::TrackingError("no active run".to_string()))?;
        f(run);
        self.storage.save_run(run)
    }
}

/// Resolve a tracking URI to a local directory
pub fn root_from_uri(uri: &str) -> Result<PathBuf> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(WineError::ConfigError("tracking URI is empty".to_string()));
    }
    if let Some(rest) = uri.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    if let Some(rest) = uri.strip_prefix("file:") {
        return Ok(PathBuf::from(rest));
    }
    if uri.contains("://") {
        return Err(WineError::ConfigError(format!(
            "unsupported tracking URI '{}': only local file stores are supported",
            uri
        )));
    }
    Ok(PathBuf::from(uri))
}
