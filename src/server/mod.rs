//! Wine quality prediction server
//!
//! Serves predictions from the most recent tracked model over HTTP.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::{predict_sample, PredictionResponse, WineSample};
pub use state::{AppState, LoadedModel};

use crate::config::{PipelineConfig, TrackingSettings};
use std::sync::Arc;
use tracing::{error, info};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Where the serving model is looked up
    pub tracking: TrackingSettings,
}

impl From<&PipelineConfig> for ServerConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            tracking: config.tracking.clone(),
        }
    }
}

/// Bind the configured address. Host names such as `localhost` are resolved.
pub async fn bind_listener(config: &ServerConfig) -> std::io::Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();

    let lookup_config = config.clone();
    let state = Arc::new(tokio::task::spawn_blocking(move || AppState::load(lookup_config)).await?);
    let app = create_router(state);

    info!(
        host = %config.host,
        port = config.port,
        tracking_uri = %config.tracking.tracking_uri,
        experiment_id = %config.tracking.experiment_id,
        started_at = %start_time.to_rfc3339(),
        "Wine quality server starting"
    );

    let listener = bind_listener(&config).await?;
    let addr = listener.local_addr()?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping server gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
