//! Integration test: training flow, tracking and result persistence

mod common;

use common::Workspace;
use polars::prelude::*;
use wine_quality_pipeline::database::ResultStore;
use wine_quality_pipeline::error::WineError;
use wine_quality_pipeline::preprocessing::run_preprocessing;
use wine_quality_pipeline::tracking::{open_tracker, RunStatus, MODEL_ARTIFACT};
use wine_quality_pipeline::training::{run_training, TrainEngine, TrainingConfig};
use wine_quality_pipeline::utils::DataLoader;

fn prepared_workspace(rows: usize) -> Workspace {
    let ws = Workspace::new().with_raw_data(rows, &[]);
    run_preprocessing(&ws.config(false)).unwrap();
    ws
}

#[test]
fn test_training_tracks_params_metrics_and_model() {
    let ws = prepared_workspace(100);
    let config = ws.config(false);

    let summary = run_training(&config).unwrap();
    assert_eq!(summary.n_test, 20);
    assert_eq!(summary.n_train, 80);
    assert!(summary.train_score.is_finite());
    assert!(summary.test_score.is_finite());
    assert!(summary.train_score > 0.5, "train R2 too low: {}", summary.train_score);
    assert!(!summary.persisted);

    let tracker = open_tracker(&config.tracking).unwrap();
    let run = tracker.get_run(&summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Finished);
    assert_eq!(run.params.get("n_estimators").map(String::as_str), Some("12"));
    assert_eq!(run.params.get("max_features").map(String::as_str), Some("all"));
    assert_eq!(run.params.get("bootstrap").map(String::as_str), Some("true"));
    assert_eq!(run.metrics.get("train_score"), Some(&summary.train_score));
    assert_eq!(run.metrics.get("test_score"), Some(&summary.test_score));
    assert!(run.artifacts.iter().any(|a| a == MODEL_ARTIFACT));

    let engine: TrainEngine = tracker.load_model(&summary.run_id).unwrap();
    assert!(engine.is_fitted());
    assert!(engine.feature_names().iter().any(|f| f == "acidity_ratio"));
    assert!(!engine.feature_names().iter().any(|f| f == "quality"));
}

#[test]
fn test_training_persists_summary_row() {
    let ws = prepared_workspace(60);
    let config = ws.config(true);

    let summary = run_training(&config).unwrap();
    assert!(summary.persisted);

    let store = ResultStore::open(config.database.path.clone()).unwrap();
    let rows = store.fetch_results();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].accuracy, summary.train_score);
    assert_eq!(rows[0].loss, summary.test_score);
    assert_eq!(rows[0].model_name, "random_forest_regressor");
    assert_eq!(rows[0].run_id.as_deref(), Some(summary.run_id.as_str()));
}

#[test]
fn test_unusable_database_does_not_fail_training() {
    let ws = prepared_workspace(40);
    let mut config = ws.config(true);
    // A regular file standing where the database directory should be.
    let blocker = ws.path("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    config.database.path = blocker.join("results.db").display().to_string();

    let summary = run_training(&config).unwrap();
    assert!(!summary.persisted);
}

#[test]
fn test_missing_target_marks_run_failed() {
    let ws = prepared_workspace(30);
    let mut config = ws.config(false);
    config.model.target_column = "score".to_string();

    let result = run_training(&config);
    assert!(matches!(result, Err(WineError::FeatureNotFound(_))));

    let tracker = open_tracker(&config.tracking).unwrap();
    let latest = tracker.latest_run().unwrap().unwrap();
    assert_eq!(latest.status, RunStatus::Failed);
    assert!(!latest.has_model());
}

#[test]
fn test_missing_processed_file_fails_before_tracking() {
    let ws = Workspace::new();
    let config = ws.config(false);

    assert!(run_training(&config).is_err());
    let tracker = open_tracker(&config.tracking).unwrap();
    assert!(tracker.search_runs().unwrap().is_empty());
}

#[test]
fn test_same_seed_gives_same_scores() {
    let ws = prepared_workspace(80);
    let df = DataLoader::new().load_csv(&ws.processed_path()).unwrap();

    let config = TrainingConfig::new("quality")
        .with_n_estimators(8)
        .with_random_state(7)
        .with_test_size(0.25);

    let mut a = TrainEngine::new(config.clone());
    let mut b = TrainEngine::new(config);
    let scores_a = a.fit(&df).unwrap();
    let scores_b = b.fit(&df).unwrap();

    assert_eq!(scores_a.train_score, scores_b.train_score);
    assert_eq!(scores_a.test_score, scores_b.test_score);
    assert_eq!(scores_a.n_test, 20);
}

#[test]
fn test_forest_learns_simple_signal() {
    let n = 120;
    let x: Vec<f64> = (0..n).map(|i| i as f64 / 10.0).collect();
    let noise: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64 * 0.01).collect();
    let y: Vec<f64> = x.iter().zip(&noise).map(|(x, e)| 2.0 * x + e).collect();
    let df = df!("x" => &x, "noise" => &noise, "quality" => &y).unwrap();

    let mut engine = TrainEngine::new(TrainingConfig::new("quality").with_n_estimators(20));
    let scores = engine.fit(&df).unwrap();
    assert!(scores.test_score > 0.8, "test R2 too low: {}", scores.test_score);
}
