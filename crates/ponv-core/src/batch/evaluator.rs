//! Parallel scoring of a dataset and metric computation.

use rayon::prelude::*;
use serde::Serialize;

use super::{BatchDataset, ClassificationMetrics, ModelProvider};
use crate::models::ModelPrediction;
use crate::risk::RiskCategory;
use crate::scoring::{HybridScorer, ScoringVariant};

/// The hybrid score predicts PONV from this category upwards.
pub const HYBRID_POSITIVE_FROM: RiskCategory = RiskCategory::Moderate;

pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Results for one input row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowEvaluation {
    pub row: usize,
    pub outcome: bool,
    pub hybrid_score: i32,
    pub category: RiskCategory,
    pub predictions: Vec<ModelPrediction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetrics {
    pub model: String,
    pub metrics: ClassificationMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub scoring_variant: ScoringVariant,
    pub decision_threshold: f64,
    pub total_rows: usize,
    pub positive_outcomes: usize,
    /// Rows in input order
    pub rows: Vec<RowEvaluation>,
    pub hybrid: ClassificationMetrics,
    pub models: Vec<ModelMetrics>,
}

pub struct BatchEvaluator<'a> {
    scorer: &'a (dyn HybridScorer + Send + Sync),
    provider: &'a dyn ModelProvider,
    decision_threshold: f64,
}

impl<'a> BatchEvaluator<'a> {
    pub fn new(
        scorer: &'a (dyn HybridScorer + Send + Sync),
        provider: &'a dyn ModelProvider,
    ) -> Self {
        Self {
            scorer,
            provider,
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, decision_threshold: f64) -> Self {
        self.decision_threshold = decision_threshold;
        self
    }

    pub fn evaluate(&self, dataset: &BatchDataset) -> BatchReport {
        let classifiers = self.provider.classifiers();

        // Indexed parallel iteration keeps input order on collect
        let rows: Vec<RowEvaluation> = dataset
            .rows()
            .par_iter()
            .map(|row| {
                let hybrid_score = self.scorer.score(&row.assessment);
                RowEvaluation {
                    row: row.row,
                    outcome: row.outcome,
                    hybrid_score,
                    category: RiskCategory::from_score(hybrid_score),
                    predictions: classifiers
                        .iter()
                        .map(|model| {
                            ModelPrediction::new(model.name(), model.predict_proba(&row.features))
                        })
                        .collect(),
                }
            })
            .collect();

        let labels: Vec<bool> = rows.iter().map(|r| r.outcome).collect();
        let positive_outcomes = labels.iter().filter(|&&l| l).count();
        if positive_outcomes == 0 || positive_outcomes == labels.len() {
            tracing::warn!(
                rows = labels.len(),
                "outcomes contain a single class; class-dependent metrics are not computable"
            );
        }

        let hybrid = ClassificationMetrics::from_decisions(
            &rows
                .iter()
                .map(|r| r.category >= HYBRID_POSITIVE_FROM)
                .collect::<Vec<_>>(),
            &rows
                .iter()
                .map(|r| f64::from(r.hybrid_score))
                .collect::<Vec<_>>(),
            &labels,
        );

        let models = classifiers
            .iter()
            .enumerate()
            .map(|(index, model)| {
                let probabilities: Vec<f64> = rows
                    .iter()
                    .map(|r| r.predictions[index].probability)
                    .collect();
                ModelMetrics {
                    model: model.name().to_string(),
                    metrics: ClassificationMetrics::from_probabilities(
                        &probabilities,
                        &labels,
                        self.decision_threshold,
                    ),
                }
            })
            .collect();

        tracing::info!(
            rows = rows.len(),
            positive_outcomes,
            models = classifiers.len(),
            hybrid_accuracy = ?hybrid.accuracy.value(),
            "batch evaluation complete"
        );

        BatchReport {
            scoring_variant: self.scorer.variant(),
            decision_threshold: self.decision_threshold,
            total_rows: rows.len(),
            positive_outcomes,
            rows,
            hybrid,
            models,
        }
    }
}
