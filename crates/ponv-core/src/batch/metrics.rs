//! Classification metrics for batch evaluation.
//!
//! A metric that needs both outcome classes, or a non-empty denominator, is
//! reported as [`Metric::NotComputable`] instead of a placeholder number.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A metric value, or the reason it does not exist for this data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Value(f64),
    NotComputable(String),
}

impl Metric {
    fn not_computable(reason: &str) -> Self {
        Metric::NotComputable(reason.to_string())
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            Metric::NotComputable(_) => None,
        }
    }

    pub fn is_computable(&self) -> bool {
        matches!(self, Metric::Value(_))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{:.3}", v),
            Metric::NotComputable(_) => f.write_str("N/A"),
        }
    }
}

/// Counts of predicted vs. actual outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn from_decisions(predicted: &[bool], labels: &[bool]) -> Self {
        let mut matrix = Self::default();
        for (&pred, &label) in predicted.iter().zip(labels.iter()) {
            match (pred, label) {
                (true, true) => matrix.true_positive += 1,
                (true, false) => matrix.false_positive += 1,
                (false, false) => matrix.true_negative += 1,
                (false, true) => matrix.false_negative += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn actual_positive(&self) -> usize {
        self.true_positive + self.false_negative
    }

    pub fn actual_negative(&self) -> usize {
        self.true_negative + self.false_positive
    }

    pub fn predicted_positive(&self) -> usize {
        self.true_positive + self.false_positive
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub confusion: ConfusionMatrix,
    pub accuracy: Metric,
    pub precision: Metric,
    pub recall: Metric,
    pub f1: Metric,
    pub roc_auc: Metric,
}

impl ClassificationMetrics {
    /// Metrics for probabilities thresholded at `threshold` (`p >= threshold` is positive).
    pub fn from_probabilities(probabilities: &[f64], labels: &[bool], threshold: f64) -> Self {
        let predicted: Vec<bool> = probabilities.iter().map(|&p| p >= threshold).collect();
        Self::from_decisions(&predicted, probabilities, labels)
    }

    /// Metrics for explicit decisions, ranking by `scores` for ROC-AUC.
    pub fn from_decisions(predicted: &[bool], scores: &[f64], labels: &[bool]) -> Self {
        let confusion = ConfusionMatrix::from_decisions(predicted, labels);
        let total = confusion.total();

        let accuracy = if total == 0 {
            Metric::not_computable("no rows")
        } else {
            Metric::Value((confusion.true_positive + confusion.true_negative) as f64 / total as f64)
        };

        let single_class = confusion.actual_positive() == 0 || confusion.actual_negative() == 0;

        let precision = if total == 0 || single_class {
            Metric::not_computable("outcomes contain a single class")
        } else if confusion.predicted_positive() == 0 {
            Metric::not_computable("no positive predictions")
        } else {
            Metric::Value(confusion.true_positive as f64 / confusion.predicted_positive() as f64)
        };

        let recall = if total == 0 || single_class {
            Metric::not_computable("outcomes contain a single class")
        } else {
            Metric::Value(confusion.true_positive as f64 / confusion.actual_positive() as f64)
        };

        let f1 = match (precision.value(), recall.value()) {
            (Some(p), Some(r)) if p + r > 0.0 => Metric::Value(2.0 * p * r / (p + r)),
            (Some(_), Some(_)) => Metric::Value(0.0),
            (None, _) => precision.clone(),
            (_, None) => recall.clone(),
        };

        Self {
            confusion,
            accuracy,
            precision,
            recall,
            f1,
            roc_auc: roc_auc(scores, labels),
        }
    }

    /// `(name, metric)` rows for display.
    pub fn rows(&self) -> [(&'static str, &Metric); 5] {
        [
            ("accuracy", &self.accuracy),
            ("precision", &self.precision),
            ("recall", &self.recall),
            ("f1", &self.f1),
            ("roc_auc", &self.roc_auc),
        ]
    }
}

/// ROC-AUC as the Mann-Whitney statistic, with tied scores sharing ranks.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Metric {
    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Metric::not_computable("outcomes contain a single class");
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Metric::not_computable("non-finite score");
    }

    let mut pairs: Vec<(f64, bool)> = scores.iter().copied().zip(labels.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    // Sum of 1-based ranks of positives, averaging ranks within ties
    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < pairs.len() {
        let mut end = start;
        while end + 1 < pairs.len() && pairs[end + 1].0 == pairs[start].0 {
            end += 1;
        }
        let mid_rank = (start + end) as f64 / 2.0 + 1.0;
        let positives_in_tie = pairs[start..=end].iter().filter(|(_, l)| *l).count();
        positive_rank_sum += mid_rank * positives_in_tie as f64;
        start = end + 1;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Metric::Value((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}
