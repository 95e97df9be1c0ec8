//! Pipeline configuration
//!
//! Settings are read from a YAML file (`configs/config.yaml` by default)
//! once per process invocation and are immutable afterwards. Two views are
//! available: [`load_config`] returns the raw nested mapping, and
//! [`PipelineConfig::from_file`] returns the typed, validated settings.

use crate::error::{Result, WineError};
use crate::training::MaxFeatures;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

/// Load a YAML file into a raw nested mapping.
pub fn load_config(path: impl AsRef<Path>) -> Result<serde_yaml::Mapping> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let mapping: serde_yaml::Mapping = serde_yaml::from_str(&contents)?;
    debug!(path = %path.display(), keys = mapping.len(), "Loaded raw configuration");
    Ok(mapping)
}

/// Input/output paths for the data preparation flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub raw_path: PathBuf,
    pub processed_path: PathBuf,
}

/// Model hyperparameters and split settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Fraction of rows held out for testing
    pub test_size: f64,
    /// Seed shared by the split and the forest
    pub random_state: u64,
    /// Number of trees
    pub n_estimators: usize,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// `all`, `sqrt` or `log2`
    #[serde(default)]
    pub max_features: MaxFeatures,
    #[serde(default = "default_bootstrap")]
    pub bootstrap: bool,
    #[serde(default = "default_target_column")]
    pub target_column: String,
    #[serde(default = "default_model_name")]
    pub name: String,
}

/// Experiment tracking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSettings {
    #[serde(default = "default_tracking_uri")]
    pub tracking_uri: String,
    #[serde(default = "default_experiment_id")]
    pub experiment_id: String,
    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            tracking_uri: default_tracking_uri(),
            experiment_id: default_experiment_id(),
            experiment_name: default_experiment_name(),
        }
    }
}

/// Relational result store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_plots_dir")]
    pub output_dir: PathBuf,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            output_dir: default_plots_dir(),
        }
    }
}

/// HTTP serving settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub model: ModelConfig,
    #[serde(default, rename = "mlflow")]
    pub tracking: TrackingSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub server: ServeConfig,
}

impl PipelineConfig {
    /// Load, apply environment overrides and validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mapping = load_config(path)?;
        let mut config: Self = serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        info!(
            path = %path.display(),
            experiment_id = %config.tracking.experiment_id,
            n_estimators = config.model.n_estimators,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse from YAML text without touching the environment.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Override selected values from a key lookup (the process environment in practice).
    ///
    /// Recognised keys: `WINE_TRACKING_URI`, `WINE_DB_PATH`, `API_HOST`, `API_PORT`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("WINE_TRACKING_URI") {
            self.tracking.tracking_uri = uri;
        }
        if let Some(db_path) = lookup("WINE_DB_PATH") {
            self.database.path = db_path;
        }
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.model.test_size > 0.0 && self.model.test_size < 1.0) {
            return Err(WineError::InvalidParameter {
                name: "model.test_size".to_string(),
                value: self.model.test_size.to_string(),
                reason: "must be strictly between 0 and 1".to_string(),
            });
        }
        if self.model.n_estimators == 0 {
            return Err(WineError::InvalidParameter {
                name: "model.n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.model.min_samples_split < 2 || self.model.min_samples_leaf == 0 {
            return Err(WineError::InvalidParameter {
                name: "model.min_samples_split/min_samples_leaf".to_string(),
                value: format!("{}/{}", self.model.min_samples_split, self.model.min_samples_leaf),
                reason: "need a split minimum of 2 and a leaf minimum of 1".to_string(),
            });
        }
        if let MaxFeatures::Fraction(f) = self.model.max_features {
            if !(f > 0.0 && f <= 1.0) {
                return Err(WineError::InvalidParameter {
                    name: "model.max_features".to_string(),
                    value: f.to_string(),
                    reason: "fraction must be in (0, 1]".to_string(),
                });
            }
        }
        if self.model.target_column.is_empty() {
            return Err(WineError::ConfigError("model.target_column is empty".to_string()));
        }
        Ok(())
    }
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_bootstrap() -> bool {
    true
}

fn default_target_column() -> String {
    "quality".to_string()
}

fn default_model_name() -> String {
    "random_forest_regressor".to_string()
}

fn default_tracking_uri() -> String {
    "file:./mlruns".to_string()
}

fn default_experiment_id() -> String {
    "0".to_string()
}

fn default_experiment_name() -> String {
    "Default".to_string()
}

fn default_db_path() -> String {
    "data/model_results.db".to_string()
}

fn default_plots_dir() -> PathBuf {
    PathBuf::from("data/processed/evaluation_plots")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}
