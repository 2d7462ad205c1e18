//! Per-assessment report bundle for renderers.

use serde::Serialize;

use crate::models::{ModelPrediction, PatientAssessment};
use crate::pipeline::RiskAssessment;
use crate::recommendations::{guidance, Guidance};
use crate::scoring::ScoringVariant;

pub const DISCLAIMER: &str = "This application is for informational and educational purposes only \
and should not be considered a substitute for professional medical advice. The predictions and \
recommendations provided are based on statistical models and should be used as decision support \
tools only. Always consult with a qualified healthcare provider for diagnosis and treatment decisions.";

pub const REFERENCES: [&str; 4] = [
    "Apfel CC, et al. A simplified risk score for predicting postoperative nausea and vomiting. Anesthesiology 1999;91:693-700.",
    "Koivuranta M, et al. A survey of postoperative nausea and vomiting. Anaesthesia 1997;52:443-449.",
    "Fourth Consensus Guidelines for the Management of Postoperative Nausea and Vomiting. Anesth Analg 2020;131:411-448.",
    "Gan TJ, et al. Consensus guidelines for the management of postoperative nausea and vomiting. Anesth Analg 2014;118:85-113.",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub factor: String,
    pub points: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    pub generated_at: String,
    pub assessment: PatientAssessment,
    pub scoring_variant: ScoringVariant,
    pub breakdown: Vec<BreakdownRow>,
    pub hybrid_score: i32,
    pub risk_category: &'static str,
    pub css_tag: &'static str,
    pub risk_percentage: u8,
    pub guidance: Guidance,
    pub recommendations: Vec<String>,
    pub model_predictions: Vec<ModelPrediction>,
    pub disclaimer: &'static str,
    pub references: [&'static str; 4],
}

impl AssessmentReport {
    pub fn new(result: &RiskAssessment, model_predictions: Vec<ModelPrediction>) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            assessment: result.assessment.clone(),
            scoring_variant: result.variant,
            breakdown: result
                .breakdown
                .labeled()
                .into_iter()
                .map(|(factor, points)| BreakdownRow { factor, points })
                .collect(),
            hybrid_score: result.hybrid_score,
            risk_category: result.category.label(),
            css_tag: result.category.css_tag(),
            risk_percentage: result.risk_percentage,
            guidance: guidance(result.category),
            recommendations: result.recommendations.clone(),
            model_predictions,
            disclaimer: DISCLAIMER,
            references: REFERENCES,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Age, ClinicalFactors};
    use crate::scoring::FullHybridScorer;

    #[test]
    fn test_report_contents() {
        let mut assessment = PatientAssessment::new(Age::new(70).unwrap());
        assessment.factors = ClinicalFactors::all();
        let result = RiskAssessment::evaluate(&assessment, &FullHybridScorer::default());
        let report = AssessmentReport::new(&result, vec![ModelPrediction::new("lr", 0.9)]);

        assert_eq!(report.hybrid_score, 14);
        assert_eq!(report.risk_category, "High Risk");
        assert_eq!(report.breakdown.len(), 24);
        assert_eq!(
            report.breakdown.iter().map(|r| r.points).sum::<i32>(),
            report.hybrid_score
        );

        let json = report.to_json().unwrap();
        assert!(json.contains("Multimodal prevention is mandatory"));
        assert!(json.contains("substitute for professional medical advice"));
    }
}
