//! Model evaluation
//!
//! Loads the most recent tracked model, rebuilds the held-out partition with
//! the seed and fraction it was trained with, computes regression metrics and
//! renders diagnostic plots. Metrics and plots are logged to a new run that
//! is tagged with the source run id.

pub mod plots;

use crate::config::PipelineConfig;
use crate::error::{Result, WineError};
use crate::flow::Flow;
use crate::tracking::{open_tracker, ExperimentTracker, RunStatus};
use crate::training::{train_test_split, RegressionMetrics, TrainEngine};
use crate::utils::DataLoader;
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ACTUAL_VS_PREDICTED_PLOT: &str = "actual_vs_predicted.svg";
pub const RESIDUAL_PLOT: &str = "residual_distribution.svg";
pub const FEATURE_IMPORTANCE_PLOT: &str = "feature_importance.svg";

/// Result of evaluating one tracked model
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub source_run_id: String,
    pub evaluation_run_id: String,
    pub metrics: RegressionMetrics,
    /// Plot files written to the output directory
    pub plots: Vec<PathBuf>,
}

/// Evaluate the latest tracked model on the held-out partition of the prepared data.
pub fn run_evaluation(config: &PipelineConfig) -> Result<EvaluationReport> {
    let tracker = open_tracker(&config.tracking)?;
    let mut flow = Flow::new("model_evaluation");

    let (source_run_id, engine) = flow.step("load_model", || load_latest_model(&tracker))?;
    let df = flow.step("load_data", || DataLoader::new().load_csv(&config.data.processed_path))?;
    let (x_test, y_test) = flow.step("split", || {
        let (x, y) = engine.extract_xy(&df)?;
        let split = train_test_split(
            x.nrows(),
            engine.config().test_size,
            engine.config().random_state,
        )?;
        let (_, x_test, _, y_test) = split.apply(&x, &y);
        Ok((x_test, y_test))
    })?;

    let report = flow.step("evaluate", || {
        evaluate_model(
            &tracker,
            &engine,
            &x_test,
            &y_test,
            &config.evaluation.output_dir,
            &source_run_id,
        )
    })?;
    flow.finish();

    Ok(report)
}

/// Latest run with a logged model, and that model.
pub fn load_latest_model(tracker: &ExperimentTracker) -> Result<(String, TrainEngine)> {
    let run = tracker.latest_model_run()?.ok_or_else(|| {
        WineError::ModelUnavailable(format!(
            "no run with a logged model in experiment '{}'",
            tracker.experiment_id()
        ))
    })?;
    let engine: TrainEngine = tracker.load_model(&run.run_id)?;
    info!(run_id = %run.run_id, "Loaded tracked model");
    Ok((run.run_id, engine))
}

/// Score a model on a test partition inside a new tracked run and write the plots.
pub fn evaluate_model(
    tracker: &ExperimentTracker,
    engine: &TrainEngine,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    output_dir: &Path,
    source_run_id: &str,
) -> Result<EvaluationReport> {
    let evaluation_run_id = tracker.start_run("evaluation")?;

    match evaluate_in_run(tracker, engine, x_test, y_test, output_dir, source_run_id) {
        Ok((metrics, plots)) => {
            tracker.end_run(RunStatus::Finished)?;
            info!(
                mse = metrics.mse,
                rmse = metrics.rmse,
                mae = metrics.mae,
                r2 = metrics.r2,
                "Evaluation complete"
            );
            Ok(EvaluationReport {
                source_run_id: source_run_id.to_string(),
                evaluation_run_id,
                metrics,
                plots,
            })
        }
        Err(e) => {
            if let Err(end_err) = tracker.end_run(RunStatus::Failed) {
                warn!(error = %end_err, "Could not mark evaluation run as failed");
            }
            Err(e)
        }
    }
}

fn evaluate_in_run(
    tracker: &ExperimentTracker,
    engine: &TrainEngine,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    output_dir: &Path,
    source_run_id: &str,
) -> Result<(RegressionMetrics, Vec<PathBuf>)> {
    tracker.log_tag("source_run_id", source_run_id)?;

    let predictions = engine.predict_array(x_test)?;
    let metrics = RegressionMetrics::compute(y_test, &predictions)?;
    for (key, value) in metrics.as_pairs() {
        tracker.log_metric(key, value)?;
    }

    let actual = y_test.to_vec();
    let predicted = predictions.to_vec();
    let residuals: Vec<f64> = actual.iter().zip(&predicted).map(|(a, p)| a - p).collect();

    let mut plots = Vec::new();

    let scatter = output_dir.join(ACTUAL_VS_PREDICTED_PLOT);
    plots::write_actual_vs_predicted(&scatter, &actual, &predicted)?;
    plots.push(scatter);

    let histogram = output_dir.join(RESIDUAL_PLOT);
    plots::write_residual_histogram(&histogram, &residuals)?;
    plots.push(histogram);

    if let Some(importances) = engine.feature_importances() {
        let bars = output_dir.join(FEATURE_IMPORTANCE_PLOT);
        plots::write_feature_importance(&bars, &importances)?;
        plots.push(bars);
    }

    for plot in &plots {
        tracker.log_artifact(plot, None)?;
    }

    Ok((metrics, plots))
}
