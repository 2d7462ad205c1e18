//! One evaluation: score, categorize, encode and select guidance.

use serde::Serialize;

use crate::features::{feature_vector, FeatureVector};
use crate::models::PatientAssessment;
use crate::recommendations::recommendations;
use crate::risk::RiskCategory;
use crate::scoring::{HybridScorer, ScoreBreakdown, ScoringVariant};

/// Everything derived from one assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub assessment: PatientAssessment,
    pub variant: ScoringVariant,
    pub breakdown: ScoreBreakdown,
    pub hybrid_score: i32,
    pub category: RiskCategory,
    pub risk_percentage: u8,
    pub features: FeatureVector,
    pub recommendations: Vec<String>,
}

impl RiskAssessment {
    pub fn evaluate(assessment: &PatientAssessment, scorer: &dyn HybridScorer) -> Self {
        let breakdown = scorer.breakdown(assessment);
        let hybrid_score = breakdown.total();
        let category = RiskCategory::from_score(hybrid_score);
        Self {
            assessment: assessment.clone(),
            variant: scorer.variant(),
            hybrid_score,
            category,
            risk_percentage: category.risk_percentage(),
            features: feature_vector(assessment),
            recommendations: recommendations(category),
            breakdown,
        }
    }

    /// `(label, css_tag)` of the category.
    pub fn category_display(&self) -> (&'static str, &'static str) {
        (self.category.label(), self.category.css_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Age, ClinicalFactor};
    use crate::scoring::{BasicHybridScorer, FullHybridScorer};

    #[test]
    fn test_evaluate_wires_every_stage() {
        let mut assessment = PatientAssessment::new(Age::new(60).unwrap());
        assessment.factors = assessment
            .factors
            .with(ClinicalFactor::FemaleGender, true)
            .with(ClinicalFactor::NonSmoker, true)
            .with(ClinicalFactor::HistoryPonv, true);

        let result = RiskAssessment::evaluate(&assessment, &FullHybridScorer::default());
        assert_eq!(result.hybrid_score, 4);
        assert_eq!(result.breakdown.total(), result.hybrid_score);
        assert_eq!(result.category, RiskCategory::Moderate);
        assert_eq!(result.risk_percentage, 50);
        assert_eq!(result.variant, ScoringVariant::Full);
        assert_eq!(result.recommendations, recommendations(RiskCategory::Moderate));
        assert_eq!(result.category_display(), ("Moderate Risk", "moderate-risk"));
    }

    #[test]
    fn test_variant_is_recorded() {
        let assessment = PatientAssessment::new(Age::new(30).unwrap());
        let result = RiskAssessment::evaluate(&assessment, &BasicHybridScorer);
        assert_eq!(result.variant, ScoringVariant::Basic);
        assert_eq!(result.category, RiskCategory::Low);
    }
}
