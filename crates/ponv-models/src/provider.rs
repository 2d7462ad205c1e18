//! Trained model bundle exposed to the core engine.

use ponv_core::batch::{ClassificationMetrics, Classifier, ModelMetrics, ModelProvider};
use ponv_core::config::TrainingConfig;
use ponv_core::features::FeatureVector;
use ponv_core::models::ModelPrediction;

use crate::boosting::GradientBoostedStumps;
use crate::dataset::{train_test_split, LabeledData};
use crate::error::ModelResult;
use crate::logistic::LogisticRegression;
use crate::synthetic::generate;

/// Held-out threshold for validation metrics.
const VALIDATION_THRESHOLD: f64 = 0.5;

/// Both reference classifiers plus how they scored on held-out rows.
///
/// Callers that need the models more than once keep this value around;
/// training is never cached globally.
#[derive(Debug, Clone)]
pub struct TrainedModels {
    logistic: LogisticRegression,
    boosting: GradientBoostedStumps,
    validation: Vec<ModelMetrics>,
    train_rows: usize,
}

impl TrainedModels {
    /// Generate the synthetic cohort described by `config` and train on it.
    pub fn train(config: &TrainingConfig) -> ModelResult<Self> {
        let data = generate(config.samples, config.seed);
        Self::train_on(&data, config)
    }

    /// Train on caller-supplied rows, holding out `validation_fraction`.
    pub fn train_on(data: &LabeledData, config: &TrainingConfig) -> ModelResult<Self> {
        let split = train_test_split(data, config.validation_fraction, config.seed)?;
        let logistic =
            LogisticRegression::fit(&split.train, config.learning_rate, config.epochs)?;
        let boosting =
            GradientBoostedStumps::fit(&split.train, config.learning_rate, config.estimators)?;

        let mut models = Self {
            logistic,
            boosting,
            validation: Vec::new(),
            train_rows: split.train.len(),
        };
        models.validation = models.score(&split.validation);

        for m in &models.validation {
            tracing::info!(
                model = %m.model,
                train_rows = models.train_rows,
                validation_rows = split.validation.len(),
                accuracy = %m.metrics.accuracy,
                roc_auc = %m.metrics.roc_auc,
                "trained classifier"
            );
        }
        Ok(models)
    }

    fn score(&self, data: &LabeledData) -> Vec<ModelMetrics> {
        self.classifiers()
            .into_iter()
            .map(|model| {
                let probabilities: Vec<f64> =
                    data.features.iter().map(|f| model.predict_proba(f)).collect();
                ModelMetrics {
                    model: model.name().to_string(),
                    metrics: ClassificationMetrics::from_probabilities(
                        &probabilities,
                        &data.labels,
                        VALIDATION_THRESHOLD,
                    ),
                }
            })
            .collect()
    }

    /// Held-out metrics, one entry per classifier.
    pub fn validation_metrics(&self) -> &[ModelMetrics] {
        &self.validation
    }

    pub fn train_rows(&self) -> usize {
        self.train_rows
    }

    /// Every classifier's probability for one assessment.
    pub fn predict(&self, features: &FeatureVector) -> Vec<ModelPrediction> {
        self.classifiers()
            .into_iter()
            .map(|model| ModelPrediction::new(model.name(), model.predict_proba(features)))
            .collect()
    }

    pub fn logistic(&self) -> &LogisticRegression {
        &self.logistic
    }

    pub fn boosting(&self) -> &GradientBoostedStumps {
        &self.boosting
    }
}

impl ModelProvider for TrainedModels {
    fn classifiers(&self) -> Vec<&dyn Classifier> {
        vec![&self.logistic, &self.boosting]
    }
}
