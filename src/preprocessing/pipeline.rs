//! Data processing flow

use super::{clean, engineer_features};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::flow::Flow;
use crate::utils::{DataLoader, DataSaver};
use polars::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Outcome of one data processing run
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_out: usize,
    pub output_path: PathBuf,
}

/// Clean and engineer an already loaded frame.
pub fn prepare_frame(df: &DataFrame) -> Result<DataFrame> {
    let cleaned = clean(df)?;
    engineer_features(&cleaned)
}

/// Load the raw file, clean it, add engineered features and save the result.
pub fn run_preprocessing(config: &PipelineConfig) -> Result<PreprocessSummary> {
    let raw_path = &config.data.raw_path;
    let processed_path = &config.data.processed_path;
    let loader = DataLoader::new();

    let mut flow = Flow::new("data_processing");
    let raw = flow.step("load", || loader.load_raw(raw_path))?;
    let cleaned = flow.step("clean", || clean(&raw))?;
    let mut features = flow.step("engineer_features", || engineer_features(&cleaned))?;
    flow.step("save", || DataSaver::save_csv(&mut features, processed_path))?;
    flow.finish();

    info!(
        rows_in = raw.height(),
        rows_out = features.height(),
        columns = features.width(),
        output = %processed_path.display(),
        "Data prepared"
    );
    Ok(PreprocessSummary {
        rows_in: raw.height(),
        rows_out: features.height(),
        columns_out: features.width(),
        output_path: processed_path.clone(),
    })
}
