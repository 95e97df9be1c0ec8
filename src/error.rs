//! Error types for the wine quality pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, WineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum WineError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Model not available: {0}")]
    ModelUnavailable(String),

    #[error("Tracking error: {0}")]
    TrackingError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<polars::error::PolarsError> for WineError {
    fn from(err: polars::error::PolarsError) -> Self {
        WineError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for WineError {
    fn from(err: serde_json::Error) -> Self {
        WineError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for WineError {
    fn from(err: serde_yaml::Error) -> Self {
        WineError::ConfigError(err.to_string())
    }
}

impl From<rusqlite::Error> for WineError {
    fn from(err: rusqlite::Error) -> Self {
        WineError::DatabaseError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for WineError {
    fn from(err: ndarray::ShapeError) -> Self {
        WineError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WineError::DataError("empty frame".to_string());
        assert_eq!(err.to_string(), "Data error: empty frame");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WineError = io_err.into();
        assert!(matches!(err, WineError::IoError(_)));
    }

    #[test]
    fn test_error_from_yaml() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Mapping>("a: [1, 2").unwrap_err();
        let err: WineError = yaml_err.into();
        assert!(matches!(err, WineError::ConfigError(_)));
    }
}
