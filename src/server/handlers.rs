//! HTTP request handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::preprocessing::{align_columns, engineer_features};
use crate::training::TrainEngine;

use super::error::{Result, ServerError};
use super::state::AppState;

/// One wine sample, as posted to `/predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WineSample {
    pub fixed_acidity: f64,
    pub volatile_acidity: f64,
    pub citric_acid: f64,
    pub residual_sugar: f64,
    pub chlorides: f64,
    pub free_sulfur_dioxide: f64,
    pub total_sulfur_dioxide: f64,
    pub density: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    pub sulphates: f64,
    pub alcohol: f64,
}

impl WineSample {
    /// One-row frame using the dataset's column names.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        df!(
            "fixed acidity" => [self.fixed_acidity],
            "volatile acidity" => [self.volatile_acidity],
            "citric acid" => [self.citric_acid],
            "residual sugar" => [self.residual_sugar],
            "chlorides" => [self.chlorides],
            "free sulfur dioxide" => [self.free_sulfur_dioxide],
            "total sulfur dioxide" => [self.total_sulfur_dioxide],
            "density" => [self.density],
            "pH" => [self.ph],
            "sulphates" => [self.sulphates],
            "alcohol" => [self.alcohol]
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_quality: f64,
}

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the Wine Quality Prediction API!",
    }))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(sample): Json<WineSample>,
) -> Result<Json<PredictionResponse>> {
    let (run_id, engine) = {
        let guard = state.model.read().await;
        let model = guard.as_ref().ok_or(ServerError::ModelUnavailable)?;
        (model.run_id.clone(), Arc::clone(&model.engine))
    };

    let predicted_quality = tokio::task::spawn_blocking(move || predict_sample(&engine, &sample))
        .await
        .map_err(|e| ServerError::Internal(format!("prediction task failed: {}", e)))??;

    debug!(run_id = %run_id, predicted_quality, "Prediction served");
    Ok(Json(PredictionResponse { predicted_quality }))
}

/// Run one sample through feature engineering and the forest.
pub fn predict_sample(engine: &TrainEngine, sample: &WineSample) -> Result<f64> {
    let frame = sample
        .to_frame()
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    let features = engineer_features(&frame)?;
    let aligned = align_columns(&features, engine.feature_names())?;

    let predictions = engine.predict(&aligned)?;
    predictions
        .first()
        .copied()
        .ok_or_else(|| ServerError::Internal("model returned no prediction".to_string()))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let guard = state.model.read().await;
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": guard.is_some(),
        "run_id": guard.as_ref().map(|m| m.run_id.clone()),
        "loaded_at": guard.as_ref().map(|m| m.loaded_at.to_rfc3339()),
    }))
}

pub async fn reload_model(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>> {
    let run_id = state.reload().await.map_err(|e| match e {
        crate::error::WineError::ModelUnavailable(msg) => ServerError::NotFound(msg),
        other => ServerError::Pipeline(other),
    })?;
    info!(run_id = %run_id, "Model reloaded via API");
    Ok(Json(serde_json::json!({
        "reloaded": true,
        "run_id": run_id,
    })))
}
