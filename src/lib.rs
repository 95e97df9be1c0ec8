//! Wine quality pipeline
//!
//! A tabular regression pipeline for the wine quality dataset:
//! - Data preparation: load, clean, engineer `acidity_ratio`, save
//! - Random forest training with a seeded train/test split
//! - Local experiment tracking of parameters, metrics and artifacts
//! - Evaluation of the latest tracked model with SVG diagnostics
//! - An HTTP prediction endpoint and a CLI for every entry point
//!
//! # Modules
//!
//! ## Pipeline
//! - [`config`] - YAML configuration
//! - [`preprocessing`] - Cleaning and feature engineering
//! - [`training`] - Trees, forests, split, metrics, training flow
//! - [`evaluation`] - Latest-model evaluation and plots
//! - [`flow`] - Named steps with logged failures
//!
//! ## Persistence
//! - [`tracking`] - Experiment tracking
//! - [`database`] - Relational result store
//!
//! ## Services
//! - [`server`] - HTTP prediction API
//! - [`cli`] - Command-line interface

pub mod error;

pub mod config;
pub mod flow;
pub mod preprocessing;
pub mod training;
pub mod evaluation;

pub mod tracking;
pub mod database;

pub mod server;
pub mod cli;

pub mod utils;

pub use error::{Result, WineError};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Result, WineError};

    pub use crate::config::{load_config, PipelineConfig};
    pub use crate::preprocessing::{clean, engineer_features, run_preprocessing};
    pub use crate::training::{
        run_training, train_test_split, RandomForest, RegressionMetrics, TrainEngine,
        TrainingConfig,
    };
    pub use crate::evaluation::{run_evaluation, EvaluationReport};

    pub use crate::tracking::{ExperimentTracker, Run, RunStatus};
    pub use crate::database::{ModelResult, ResultStore};

    pub use crate::utils::{DataLoader, DataSaver};
}
