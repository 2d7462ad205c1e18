//! Gradient-boosted decision stumps with logistic loss.
//!
//! Each round fits one depth-1 tree to the gradient of the log-loss using
//! Newton leaf values, `leaf = G / (H + lambda)`, and adds it to the log-odds
//! scaled by the learning rate.

use ponv_core::batch::Classifier;
use ponv_core::features::{FeatureVector, FEATURE_COUNT};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::LabeledData;
use crate::error::{ModelError, ModelResult};
use crate::sigmoid;

pub const BOOSTING_MODEL_NAME: &str = "gradient_boosting";

/// L2 penalty on leaf values.
const LAMBDA: f64 = 1.0;

/// One split: `x[feature] <= threshold` goes left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stump {
    pub feature: usize,
    pub threshold: f64,
    pub left: f64,
    pub right: f64,
}

impl Stump {
    fn predict(&self, features: &FeatureVector) -> f64 {
        if features.0[self.feature] <= self.threshold {
            self.left
        } else {
            self.right
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedStumps {
    /// Log-odds of the training base rate
    base_score: f64,
    learning_rate: f64,
    stumps: Vec<Stump>,
}

struct Candidate {
    gain: f64,
    stump: Stump,
}

fn best_split_on(
    feature: usize,
    data: &LabeledData,
    gradients: &[f64],
    hessians: &[f64],
) -> Option<Candidate> {
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| data.features[a].0[feature].total_cmp(&data.features[b].0[feature]));

    let g_total: f64 = gradients.iter().sum();
    let h_total: f64 = hessians.iter().sum();
    let score = |g: f64, h: f64| g * g / (h + LAMBDA);
    let parent = score(g_total, h_total);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<Candidate> = None;
    for pair in order.windows(2) {
        let (i, next) = (pair[0], pair[1]);
        g_left += gradients[i];
        h_left += hessians[i];

        let value = data.features[i].0[feature];
        let next_value = data.features[next].0[feature];
        if value == next_value {
            continue;
        }

        let (g_right, h_right) = (g_total - g_left, h_total - h_left);
        let gain = score(g_left, h_left) + score(g_right, h_right) - parent;
        if best.as_ref().map_or(true, |b| gain > b.gain) {
            best = Some(Candidate {
                gain,
                stump: Stump {
                    feature,
                    threshold: (value + next_value) / 2.0,
                    left: g_left / (h_left + LAMBDA),
                    right: g_right / (h_right + LAMBDA),
                },
            });
        }
    }
    best
}

impl GradientBoostedStumps {
    pub fn fit(data: &LabeledData, learning_rate: f64, estimators: usize) -> ModelResult<Self> {
        if learning_rate.is_nan() || learning_rate <= 0.0 {
            return Err(ModelError::InvalidParameter {
                field: "learning_rate",
                reason: format!("{} is not positive", learning_rate),
            });
        }
        data.require_trainable()?;

        let base_rate = data.positives() as f64 / data.len() as f64;
        let base_score = (base_rate / (1.0 - base_rate)).ln();
        let targets: Vec<f64> = data
            .labels
            .iter()
            .map(|&l| if l { 1.0 } else { 0.0 })
            .collect();
        let mut log_odds = vec![base_score; data.len()];
        let mut stumps = Vec::with_capacity(estimators);

        for _ in 0..estimators {
            let probabilities: Vec<f64> = log_odds.iter().map(|&f| sigmoid(f)).collect();
            let gradients: Vec<f64> = targets
                .iter()
                .zip(&probabilities)
                .map(|(y, p)| y - p)
                .collect();
            let hessians: Vec<f64> = probabilities.iter().map(|p| p * (1.0 - p)).collect();

            let best = (0..FEATURE_COUNT)
                .into_par_iter()
                .filter_map(|feature| best_split_on(feature, data, &gradients, &hessians))
                .max_by(|a, b| a.gain.total_cmp(&b.gain));
            let Some(Candidate { stump, .. }) = best else {
                // Every column is constant
                break;
            };

            for (f, row) in log_odds.iter_mut().zip(&data.features) {
                *f += learning_rate * stump.predict(row);
            }
            stumps.push(stump);
        }

        tracing::debug!(
            rounds = stumps.len(),
            learning_rate,
            base_score,
            "fitted gradient-boosted stumps"
        );
        Ok(Self {
            base_score,
            learning_rate,
            stumps,
        })
    }

    pub fn stumps(&self) -> &[Stump] {
        &self.stumps
    }

    /// Times each feature was chosen for a split.
    pub fn split_counts(&self) -> [usize; FEATURE_COUNT] {
        let mut counts = [0; FEATURE_COUNT];
        for stump in &self.stumps {
            counts[stump.feature] += 1;
        }
        counts
    }
}

impl Classifier for GradientBoostedStumps {
    fn name(&self) -> &str {
        BOOSTING_MODEL_NAME
    }

    fn predict_proba(&self, features: &FeatureVector) -> f64 {
        let boost: f64 = self.stumps.iter().map(|s| s.predict(features)).sum();
        sigmoid(self.base_score + self.learning_rate * boost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::generate;

    fn separable() -> LabeledData {
        let features = (0..20)
            .map(|i| {
                let mut values = [0.0; FEATURE_COUNT];
                values[15] = i as f64;
                FeatureVector(values)
            })
            .collect();
        let labels = (0..20).map(|i| i < 10).collect();
        LabeledData::new(features, labels).unwrap()
    }

    #[test]
    fn test_first_split_separates_classes() {
        let model = GradientBoostedStumps::fit(&separable(), 0.5, 10).unwrap();
        let first = model.stumps()[0];
        assert_eq!(first.feature, 15);
        assert_eq!(first.threshold, 9.5);
        assert!(first.left > 0.0 && first.right < 0.0);

        let mut low = [0.0; FEATURE_COUNT];
        low[15] = 2.0;
        let mut high = [0.0; FEATURE_COUNT];
        high[15] = 17.0;
        assert!(model.predict_proba(&FeatureVector(low)) > 0.8);
        assert!(model.predict_proba(&FeatureVector(high)) < 0.2);
    }

    #[test]
    fn test_zero_rounds_predicts_base_rate() {
        let model = GradientBoostedStumps::fit(&separable(), 0.1, 0).unwrap();
        let p = model.predict_proba(&FeatureVector([0.0; FEATURE_COUNT]));
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_splits_on_informative_columns() {
        let data = generate(500, 42);
        let model = GradientBoostedStumps::fit(&data, 0.1, 50).unwrap();
        assert_eq!(model.stumps().len(), 50);
        let counts = model.split_counts();
        // Age and surgery duration do not enter the outcome
        let informative: usize = [0, 12, 15, 16].iter().map(|&i| counts[i]).sum();
        assert!(informative > counts[3] + counts[10]);
    }
}
