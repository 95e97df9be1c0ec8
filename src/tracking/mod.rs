//! Experiment tracking module
//!
//! A local, file-backed run tracker in the spirit of MLflow's file store:
//! experiments hold runs, runs hold parameters, metrics, tags and artifacts,
//! and the most recent run with a logged model is what evaluation and
//! serving pick up.

mod storage;
mod tracker;

pub use storage::{LocalStorage, StorageBackend};
pub use tracker::{
    root_from_uri, Experiment, ExperimentTracker, Metric, Run, RunStatus, MODEL_ARTIFACT,
};

use crate::config::TrackingSettings;
use crate::error::Result;

/// Open the tracker described by the settings and make sure its experiment exists.
pub fn open_tracker(settings: &TrackingSettings) -> Result<ExperimentTracker> {
    let tracker = ExperimentTracker::from_uri(&settings.tracking_uri, settings.experiment_id.clone())?;
    tracker.ensure_experiment(&settings.experiment_name)?;
    Ok(tracker)
}
