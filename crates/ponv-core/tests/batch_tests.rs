//! Batch evaluation from an uploaded CSV file.

use std::io::Write;

use ponv_core::batch::{
    required_columns, BatchDataset, BatchError, BatchEvaluator, Classifier, ModelProvider,
    NoModels,
};
use ponv_core::config::ScoringConfig;
use ponv_core::features::{FeatureVector, FEATURE_COUNT, FENTANYL_INDEX};
use ponv_core::risk::RiskCategory;
use ponv_core::scoring::{scorer_for, ScoringVariant};

/// Predicts from the fentanyl column only.
struct OpioidModel;

impl Classifier for OpioidModel {
    fn name(&self) -> &str {
        "opioid_model"
    }

    fn predict_proba(&self, features: &FeatureVector) -> f64 {
        (features.0[FENTANYL_INDEX] * 2.0).min(1.0)
    }
}

struct Provider(OpioidModel);

impl ModelProvider for Provider {
    fn classifiers(&self) -> Vec<&dyn Classifier> {
        vec![&self.0]
    }
}

/// `(female, history_ponv, age, fentanyl_mg, outcome)`
fn write_dataset(rows: &[(u8, u8, u32, f64, u8)]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", required_columns().collect::<Vec<_>>().join(",")).unwrap();
    for &(female, history, age, fentanyl_mg, outcome) in rows {
        let mut cells = vec!["0".to_string(); FEATURE_COUNT];
        cells[0] = female.to_string();
        cells[2] = history.to_string();
        cells[3] = age.to_string();
        cells[FENTANYL_INDEX] = fentanyl_mg.to_string();
        cells.push(outcome.to_string());
        writeln!(file, "{}", cells.join(",")).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_evaluate_file_with_model() {
    let file = write_dataset(&[
        (1, 1, 60, 0.6, 1),
        (1, 1, 70, 0.3, 1),
        (0, 0, 30, 0.0, 0),
        (0, 1, 25, 0.05, 0),
    ]);
    let dataset = BatchDataset::from_path(file.path()).unwrap();
    assert_eq!(dataset.len(), 4);

    let scorer = scorer_for(&ScoringConfig::default());
    let provider = Provider(OpioidModel);
    let report = BatchEvaluator::new(scorer.as_ref(), &provider).evaluate(&dataset);

    assert_eq!(report.scoring_variant, ScoringVariant::Full);
    assert_eq!(report.total_rows, 4);
    assert_eq!(report.positive_outcomes, 2);

    // 0.6 mg fentanyl is 600 mcg: female + history + age + 3
    assert_eq!(report.rows[0].hybrid_score, 6);
    assert_eq!(report.rows[0].category, RiskCategory::Moderate);
    // 300 mcg scores 2
    assert_eq!(report.rows[1].hybrid_score, 5);
    assert_eq!(report.rows[2].hybrid_score, 0);
    assert_eq!(report.rows[3].hybrid_score, 2);

    assert_eq!(report.hybrid.accuracy.value(), Some(1.0));
    assert_eq!(report.hybrid.roc_auc.value(), Some(1.0));

    let model = &report.models[0];
    assert_eq!(model.model, "opioid_model");
    assert_eq!(model.metrics.accuracy.value(), Some(1.0));
    assert_eq!(model.metrics.roc_auc.value(), Some(1.0));
}

#[test]
fn test_basic_variant_ignores_doses() {
    let file = write_dataset(&[(1, 1, 60, 0.6, 1), (0, 0, 30, 0.0, 0)]);
    let dataset = BatchDataset::from_path(file.path()).unwrap();
    let scorer = scorer_for(&ScoringConfig {
        variant: ScoringVariant::Basic,
        include_muscle_relaxant: true,
    });
    let report = BatchEvaluator::new(scorer.as_ref(), &NoModels).evaluate(&dataset);
    assert_eq!(report.rows[0].hybrid_score, 3);
    assert!(report.models.is_empty());
}

#[test]
fn test_invalid_file_is_rejected_whole() {
    let file = write_dataset(&[(1, 1, 60, 0.6, 1), (2, 0, 30, 0.0, 0)]);
    match BatchDataset::from_path(file.path()) {
        Err(BatchError::InvalidRows(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].row, 2);
            assert_eq!(errors[0].column, "Female");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(matches!(
        BatchDataset::from_path(tmp.path().join("absent.csv")),
        Err(BatchError::Io(_))
    ));
}

#[test]
fn test_metrics_display_for_single_class() {
    let file = write_dataset(&[(1, 1, 60, 0.6, 0), (0, 0, 30, 0.0, 0)]);
    let dataset = BatchDataset::from_path(file.path()).unwrap();
    let scorer = scorer_for(&ScoringConfig::default());
    let report = BatchEvaluator::new(scorer.as_ref(), &NoModels).evaluate(&dataset);
    assert_eq!(report.hybrid.roc_auc.to_string(), "N/A");
    assert_eq!(report.hybrid.accuracy.to_string(), "0.500");
}
