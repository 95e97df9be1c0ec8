//! Application state management

use crate::error::{Result, WineError};
use crate::evaluation::load_latest_model;
use crate::tracking::ExperimentTracker;
use crate::training::TrainEngine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::ServerConfig;

/// The model currently used for predictions
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub run_id: String,
    pub engine: Arc<TrainEngine>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedModel {
    pub fn new(run_id: impl Into<String>, engine: TrainEngine) -> Self {
        Self {
            run_id: run_id.into(),
            engine: Arc::new(engine),
            loaded_at: Utc::now(),
        }
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub model: RwLock<Option<LoadedModel>>,
}

impl AppState {
    /// State with no model; every prediction fails until a reload succeeds.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            model: RwLock::new(None),
        }
    }

    pub fn with_model(config: ServerConfig, model: LoadedModel) -> Self {
        Self {
            config,
            model: RwLock::new(Some(model)),
        }
    }

    /// Build the state, loading the latest tracked model if there is one.
    pub fn load(config: ServerConfig) -> Self {
        match lookup_model(&config) {
            Ok(model) => {
                info!(run_id = %model.run_id, "Serving model loaded");
                Self::with_model(config, model)
            }
            Err(e) => {
                warn!(error = %e, "No model loaded, predictions will fail until a reload succeeds");
                Self::new(config)
            }
        }
    }

    /// Repeat the latest-run lookup and swap the model in.
    ///
    /// The current model stays in place when the lookup fails.
    pub async fn reload(&self) -> Result<String> {
        let config = self.config.clone();
        let model = tokio::task::spawn_blocking(move || lookup_model(&config))
            .await
            .map_err(|e| WineError::TrackingError(format!("model lookup task failed: {}", e)))??;

        let run_id = model.run_id.clone();
        *self.model.write().await = Some(model);
        info!(run_id = %run_id, "Serving model reloaded");
        Ok(run_id)
    }

    pub async fn model_run_id(&self) -> Option<String> {
        self.model.read().await.as_ref().map(|m| m.run_id.clone())
    }
}

fn lookup_model(config: &ServerConfig) -> Result<LoadedModel> {
    let tracker = ExperimentTracker::from_uri(
        &config.tracking.tracking_uri,
        config.tracking.experiment_id.clone(),
    )?;
    let (run_id, engine) = load_latest_model(&tracker)?;
    Ok(LoadedModel::new(run_id, engine))
}
