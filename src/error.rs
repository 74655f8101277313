//! Error types for the seatcast forecasting engine

use thiserror::Error;

/// Result type alias for seatcast operations
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Message reported when no column can serve as the forecast target
pub const NO_TARGET_MESSAGE: &str = "No numeric column found to analyze as demand/target";

/// Main error type for the forecasting engine
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("No file uploaded")]
    NoDataset,

    #[error("{0}")]
    EmptyDataset(String),

    #[error("No numeric column found to analyze as demand/target")]
    NoNumericTarget,

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("History error: {0}")]
    HistoryError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl ForecastError {
    /// Input errors are the only failures reported back to the caller;
    /// every other condition has a degradation path inside the engine.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ForecastError::NoDataset | ForecastError::EmptyDataset(_) | ForecastError::NoNumericTarget
        )
    }
}

impl From<polars::error::PolarsError> for ForecastError {
    fn from(err: polars::error::PolarsError) -> Self {
        ForecastError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ForecastError {
    fn from(err: ndarray::ShapeError) -> Self {
        ForecastError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
