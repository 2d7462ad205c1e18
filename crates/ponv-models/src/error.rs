//! Training errors.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Training data is empty")]
    EmptyData,

    #[error("Training data contains a single outcome class")]
    SingleClass,

    #[error("Dimension mismatch: {features} feature rows but {labels} labels")]
    DimensionMismatch { features: usize, labels: usize },

    #[error("Invalid training parameter {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("CSV error: {0}")]
    Csv(String),
}

impl From<csv::Error> for ModelError {
    fn from(e: csv::Error) -> Self {
        ModelError::Csv(e.to_string())
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
