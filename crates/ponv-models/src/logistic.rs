//! Logistic regression fitted by batch gradient descent on standardized
//! features.

use ponv_core::batch::Classifier;
use ponv_core::features::{FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

use crate::dataset::LabeledData;
use crate::error::{ModelError, ModelResult};
use crate::scaler::StandardScaler;
use crate::sigmoid;

pub const LOGISTIC_MODEL_NAME: &str = "logistic_regression";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    scaler: StandardScaler,
    weights: [f64; FEATURE_COUNT],
    bias: f64,
}

fn dot(weights: &[f64; FEATURE_COUNT], x: &[f64; FEATURE_COUNT]) -> f64 {
    weights.iter().zip(x.iter()).map(|(w, v)| w * v).sum()
}

impl LogisticRegression {
    pub fn fit(data: &LabeledData, learning_rate: f64, epochs: usize) -> ModelResult<Self> {
        if learning_rate.is_nan() || learning_rate <= 0.0 {
            return Err(ModelError::InvalidParameter {
                field: "learning_rate",
                reason: format!("{} is not positive", learning_rate),
            });
        }
        data.require_trainable()?;

        let scaler = StandardScaler::fit(&data.features)?;
        let xs: Vec<[f64; FEATURE_COUNT]> =
            data.features.iter().map(|f| scaler.transform(f)).collect();
        let n = xs.len() as f64;

        let mut weights = [0.0; FEATURE_COUNT];
        let mut bias = 0.0;
        for _ in 0..epochs {
            let mut grad_w = [0.0; FEATURE_COUNT];
            let mut grad_b = 0.0;
            for (x, &label) in xs.iter().zip(&data.labels) {
                let error = sigmoid(dot(&weights, x) + bias) - if label { 1.0 } else { 0.0 };
                for (g, v) in grad_w.iter_mut().zip(x.iter()) {
                    *g += error * v;
                }
                grad_b += error;
            }
            for (w, g) in weights.iter_mut().zip(grad_w.iter()) {
                *w -= learning_rate * g / n;
            }
            bias -= learning_rate * grad_b / n;
        }

        tracing::debug!(epochs, learning_rate, bias, "fitted logistic regression");
        Ok(Self {
            scaler,
            weights,
            bias,
        })
    }

    /// Coefficients on the standardized scale, in feature order.
    pub fn weights(&self) -> &[f64; FEATURE_COUNT] {
        &self.weights
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        LOGISTIC_MODEL_NAME
    }

    fn predict_proba(&self, features: &FeatureVector) -> f64 {
        sigmoid(dot(&self.weights, &self.scaler.transform(features)) + self.bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::generate;

    #[test]
    fn test_learns_generator_signs() {
        let data = generate(500, 42);
        let model = LogisticRegression::fit(&data, 0.1, 300).unwrap();
        // Female raises risk, ondansetron lowers it, Age carries no weight
        assert!(model.weights()[0] > 0.0);
        assert!(model.weights()[15] < 0.0);
        assert!(model.weights()[0].abs() > model.weights()[3].abs());
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let data = generate(200, 1);
        let model = LogisticRegression::fit(&data, 0.1, 100).unwrap();
        for row in &data.features {
            let p = model.predict_proba(row);
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let data = generate(50, 3);
        assert!(matches!(
            LogisticRegression::fit(&data, 0.0, 10),
            Err(ModelError::InvalidParameter { .. })
        ));
        assert_eq!(
            LogisticRegression::fit(&LabeledData::default(), 0.1, 10),
            Err(ModelError::EmptyData)
        );
    }
}
