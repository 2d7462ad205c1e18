//! Batch evaluation of uploaded datasets against the hybrid score and
//! injected classifiers.

mod dataset;
mod evaluator;
mod metrics;

pub use dataset::*;
pub use evaluator::*;
pub use metrics::*;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::features::FeatureVector;

/// Batch evaluation errors.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Dataset is missing required columns: {}", .missing.join(", "))]
    SchemaMismatch {
        missing: Vec<String>,
        /// `(missing column, similar column present in the upload)`
        suggestions: Vec<(String, String)>,
    },

    #[error("Dataset has {} invalid value(s); first: {}", .0.len(), first_error(.0))]
    InvalidRows(Vec<RowError>),

    #[error("Dataset contains no rows")]
    Empty,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn first_error(errors: &[RowError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

pub type BatchResult<T> = Result<T, BatchError>;

/// A rejected cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based data row number
    pub row: usize,
    pub column: String,
    pub reason: String,
}

impl RowError {
    pub fn new(row: usize, column: &str, reason: impl Into<String>) -> Self {
        Self {
            row,
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}, column '{}': {}", self.row, self.column, self.reason)
    }
}

/// A trained probabilistic classifier over the feature vector.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Probability of PONV, in [0, 1].
    fn predict_proba(&self, features: &FeatureVector) -> f64;
}

/// Source of trained classifiers, injected by the caller.
pub trait ModelProvider: Send + Sync {
    fn classifiers(&self) -> Vec<&dyn Classifier>;
}

/// Provider with no models; only the hybrid score is evaluated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModels;

impl ModelProvider for NoModels {
    fn classifiers(&self) -> Vec<&dyn Classifier> {
        Vec::new()
    }
}
