//! Training flow

use super::{TrainEngine, TrainingConfig, TrainingScores};
use crate::config::{DatabaseConfig, PipelineConfig};
use crate::database::{ModelResult, ResultStore};
use crate::error::Result;
use crate::flow::Flow;
use crate::tracking::{open_tracker, ExperimentTracker, RunStatus};
use crate::utils::DataLoader;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub run_id: String,
    pub train_score: f64,
    pub test_score: f64,
    pub n_train: usize,
    pub n_test: usize,
    /// Whether the summary row reached the result store
    pub persisted: bool,
}

/// Train on the prepared dataset, track the run and optionally store a summary row.
pub fn run_training(config: &PipelineConfig) -> Result<TrainingSummary> {
    let training_config = TrainingConfig::from(&config.model);
    let tracker = open_tracker(&config.tracking)?;

    let mut flow = Flow::new("model_training");
    let df = flow.step("load", || DataLoader::new().load_csv(&config.data.processed_path))?;

    let run_id = tracker.start_run("training")?;
    let tracked = flow.step("train", || train_tracked(&tracker, &training_config, &df));
    let (engine, scores) = match tracked {
        Ok(result) => {
            tracker.end_run(RunStatus::Finished)?;
            result
        }
        Err(e) => {
            if let Err(end_err) = tracker.end_run(RunStatus::Failed) {
                warn!(error = %end_err, "Could not mark run as failed");
            }
            return Err(e);
        }
    };

    let persisted = if config.database.enabled {
        flow.step("persist", || {
            Ok(persist_result(&config.database, &engine, &scores, &run_id))
        })?
    } else {
        false
    };
    flow.finish();

    Ok(TrainingSummary {
        run_id,
        train_score: scores.train_score,
        test_score: scores.test_score,
        n_train: scores.n_train,
        n_test: scores.n_test,
        persisted,
    })
}

fn train_tracked(
    tracker: &ExperimentTracker,
    config: &TrainingConfig,
    df: &polars::prelude::DataFrame,
) -> Result<(TrainEngine, TrainingScores)> {
    tracker.log_param("n_estimators", config.n_estimators)?;
    tracker.log_param("test_size", config.test_size)?;
    tracker.log_param("random_state", config.random_state)?;
    tracker.log_param(
        "max_depth",
        config.max_depth.map_or_else(|| "None".to_string(), |d| d.to_string()),
    )?;
    tracker.log_param("min_samples_split", config.min_samples_split)?;
    tracker.log_param("min_samples_leaf", config.min_samples_leaf)?;
    tracker.log_param("max_features", config.max_features)?;
    tracker.log_param("bootstrap", config.bootstrap)?;

    let mut engine = TrainEngine::new(config.clone());
    let scores = engine.fit(df)?;

    tracker.log_metric("train_score", scores.train_score)?;
    tracker.log_metric("test_score", scores.test_score)?;
    tracker.log_model(&engine)?;

    Ok((engine, scores))
}

/// Store the summary row. Any failure is logged and reported as `false`.
fn persist_result(
    db: &DatabaseConfig,
    engine: &TrainEngine,
    scores: &TrainingScores,
    run_id: &str,
) -> bool {
    let mut store = match ResultStore::open(db.path.clone()) {
        Ok(store) => store,
        Err(e) => {
            warn!(path = %db.path, error = %e, "Result store unavailable, skipping persistence");
            return false;
        }
    };

    let row = ModelResult::new(scores.train_score, scores.test_score, &engine.config().model_name)
        .with_run_id(run_id);
    let inserted = store.insert_result(&row);
    store.close();

    if inserted {
        info!(run_id, "Stored training result");
    } else {
        warn!(run_id, "Training result was not stored");
    }
    inserted
}
