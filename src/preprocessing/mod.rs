//! Data preparation module
//!
//! Turns the raw wine quality file into the training table:
//! - `load`: semicolon-delimited read with comma fallback
//! - `clean`: drop rows holding any missing value
//! - `engineer_features`: derive `acidity_ratio`
//! - `save`: comma-delimited output without an index column

mod cleaning;
mod features;
mod pipeline;

pub use cleaning::{clean, missing_value_count};
pub use features::{
    align_columns, engineer_features, resolve_column, ACIDITY_EPSILON, ACIDITY_RATIO, FIXED_ACIDITY,
    VOLATILE_ACIDITY,
};
pub use pipeline::{prepare_frame, run_preprocessing, PreprocessSummary};
