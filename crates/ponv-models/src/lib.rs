//! Reference classifiers for the PONV risk engine.
//!
//! The core library only sees trained models through
//! [`ponv_core::batch::ModelProvider`]. This crate supplies one: a seeded
//! synthetic training set, a standard scaler, logistic regression and
//! gradient-boosted decision stumps.

pub mod boosting;
pub mod dataset;
pub mod error;
pub mod logistic;
pub mod provider;
pub mod scaler;
pub mod synthetic;

pub use boosting::GradientBoostedStumps;
pub use dataset::{train_test_split, LabeledData, Split};
pub use error::{ModelError, ModelResult};
pub use logistic::LogisticRegression;
pub use provider::TrainedModels;
pub use scaler::StandardScaler;
pub use synthetic::generate;

/// Logistic function.
pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
