//! Integration test: prediction API endpoints

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{wine_row, RAW_COLUMNS};
use polars::prelude::*;
use std::sync::Arc;
use tower::ServiceExt;
use wine_quality_pipeline::config::TrackingSettings;
use wine_quality_pipeline::preprocessing::engineer_features;
use wine_quality_pipeline::server::{
    create_router, predict_sample, AppState, LoadedModel, ServerConfig, WineSample,
};
use wine_quality_pipeline::tracking::{ExperimentTracker, RunStatus};
use wine_quality_pipeline::training::{TrainEngine, TrainingConfig};

const SAMPLE: &str = r#"{
    "fixed_acidity": 7.4,
    "volatile_acidity": 0.7,
    "citric_acid": 0.0,
    "residual_sugar": 1.9,
    "chlorides": 0.076,
    "free_sulfur_dioxide": 11.0,
    "total_sulfur_dioxide": 34.0,
    "density": 0.9978,
    "pH": 3.51,
    "sulphates": 0.56,
    "alcohol": 9.4
}"#;

fn server_config(root: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tracking: TrackingSettings {
            tracking_uri: format!("file:{}", root.display()),
            experiment_id: "0".to_string(),
            experiment_name: "Default".to_string(),
        },
    }
}

fn trained_engine() -> TrainEngine {
    let columns: Vec<Column> = RAW_COLUMNS
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<f64> = (0..60).map(|i| wine_row(i)[j]).collect();
            Column::new((*name).into(), values)
        })
        .collect();
    let df = engineer_features(&DataFrame::new(columns).unwrap()).unwrap();

    let mut engine = TrainEngine::new(TrainingConfig::new("quality").with_n_estimators(5));
    engine.fit(&df).unwrap();
    engine
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(Arc::new(AppState::new(server_config(dir.path()))));

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Welcome to the Wine Quality Prediction API!");
}

#[tokio::test]
async fn test_predict_without_model_returns_500() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(Arc::new(AppState::load(server_config(dir.path()))));

    let response = app.oneshot(post_json("/predict", SAMPLE)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Model not available");
}

#[tokio::test]
async fn test_predict_with_model() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::with_model(
        server_config(dir.path()),
        LoadedModel::new("run-1", trained_engine()),
    );
    let app = create_router(Arc::new(state));

    let response = app.oneshot(post_json("/predict", SAMPLE)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let predicted = json["predicted_quality"].as_f64().unwrap();
    assert!((3.0..=8.0).contains(&predicted), "unexpected prediction {}", predicted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_predictions_agree() {
    let dir = tempfile::tempdir().unwrap();
    let engine = trained_engine();
    let sample: WineSample = serde_json::from_str(SAMPLE).unwrap();
    let expected = predict_sample(&engine, &sample).unwrap();

    let state = Arc::new(AppState::with_model(
        server_config(dir.path()),
        LoadedModel::new("run-1", engine),
    ));

    let requests = (0..8).map(|_| {
        let app = create_router(state.clone());
        tokio::spawn(async move { app.oneshot(post_json("/predict", SAMPLE)).await.unwrap() })
    });
    for handle in requests.collect::<Vec<_>>() {
        let response = handle.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let predicted = body_json(response).await["predicted_quality"].as_f64().unwrap();
        assert!((predicted - expected).abs() < 1e-9);
    }

    // the model slot is free again once the predictions are done
    assert!(state.model.try_write().is_ok());
}

#[tokio::test]
async fn test_predict_missing_field_is_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::with_model(
        server_config(dir.path()),
        LoadedModel::new("run-1", trained_engine()),
    );
    let app = create_router(Arc::new(state));

    let response = app
        .oneshot(post_json("/predict", r#"{"fixed_acidity": 7.4}"#))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_health_reports_model_state() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(Arc::new(AppState::new(server_config(dir.path()))));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model_loaded"], false);
}

#[tokio::test]
async fn test_reload_picks_up_tracked_model() {
    let dir = tempfile::tempdir().unwrap();
    let state = Arc::new(AppState::new(server_config(dir.path())));

    let response = create_router(state.clone())
        .oneshot(post_json("/model/reload", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let tracker = ExperimentTracker::with_dir(dir.path(), "0");
    let run_id = tracker.start_run("training").unwrap();
    tracker.log_model(&trained_engine()).unwrap();
    tracker.end_run(RunStatus::Finished).unwrap();

    let response = create_router(state.clone())
        .oneshot(post_json("/model/reload", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["run_id"], run_id.as_str());
    assert_eq!(state.model_run_id().await, Some(run_id));

    let response = create_router(state)
        .oneshot(post_json("/predict", SAMPLE))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(Arc::new(AppState::new(server_config(dir.path()))));
    let response = app.oneshot(get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
