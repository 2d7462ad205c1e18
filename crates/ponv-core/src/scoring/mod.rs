//! Hybrid score aggregation.
//!
//! Two scoring strategies exist:
//!
//! - [`FullHybridScorer`]: clinical factors, age, every dose-response term,
//!   propofol technique and (unless disabled) the muscle relaxant
//! - [`BasicHybridScorer`]: clinical factors and age only
//!
//! The variant is chosen through [`ScoringConfig`]; nothing picks one implicitly
//! except the convenience functions [`calculate_hybrid_score`] and
//! [`score_breakdown`], which use the full scorer.

mod breakdown;
mod dose_response;

pub use breakdown::*;
pub use dose_response::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ScoringConfig;
use crate::models::{ClinicalFactor, Drug, PatientAssessment};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown scoring variant '{0}' (expected 'full' or 'basic')")]
pub struct UnknownVariant(pub String);

/// Named scoring strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringVariant {
    #[default]
    Full,
    Basic,
}

impl ScoringVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoringVariant::Full => "full",
            ScoringVariant::Basic => "basic",
        }
    }
}

impl fmt::Display for ScoringVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoringVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(ScoringVariant::Full),
            "basic" => Ok(ScoringVariant::Basic),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// A hybrid scoring strategy.
pub trait HybridScorer {
    fn variant(&self) -> ScoringVariant;

    /// Itemized contributions, in display order.
    fn breakdown(&self, assessment: &PatientAssessment) -> ScoreBreakdown;

    /// The hybrid score. Always equal to `breakdown(assessment).total()`.
    fn score(&self, assessment: &PatientAssessment) -> i32 {
        self.breakdown(assessment).total()
    }
}

/// Clinical factors in display order, with age after the third factor.
fn push_binary_terms(breakdown: &mut ScoreBreakdown, assessment: &PatientAssessment) {
    for (index, (factor, present)) in assessment.factors.iter().enumerate() {
        if index == ClinicalFactor::BEFORE_AGE {
            breakdown.push(Factor::Age, i32::from(assessment.age.is_over_50()));
        }
        breakdown.push(Factor::Clinical(factor), i32::from(present));
    }
}

fn traced(variant: ScoringVariant, breakdown: ScoreBreakdown) -> ScoreBreakdown {
    tracing::debug!(
        variant = %variant,
        total = breakdown.total(),
        terms = breakdown.len(),
        "computed hybrid score"
    );
    breakdown
}

/// Clinical factors, age, dose-response terms and propofol technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullHybridScorer {
    /// Score the muscle relaxant choice
    pub include_muscle_relaxant: bool,
}

impl Default for FullHybridScorer {
    fn default() -> Self {
        Self {
            include_muscle_relaxant: true,
        }
    }
}

impl HybridScorer for FullHybridScorer {
    fn variant(&self) -> ScoringVariant {
        ScoringVariant::Full
    }

    fn breakdown(&self, assessment: &PatientAssessment) -> ScoreBreakdown {
        let mut breakdown = ScoreBreakdown::new();
        push_binary_terms(&mut breakdown, assessment);
        for drug in Drug::ALL {
            breakdown.push(
                Factor::Drug(drug),
                drug_score(drug, assessment.doses.get(drug)),
            );
        }
        breakdown.push(Factor::Propofol, propofol_score(assessment.propofol));
        if self.include_muscle_relaxant {
            breakdown.push(
                Factor::MuscleRelaxant,
                muscle_relaxant_score(&assessment.muscle_relaxant),
            );
        }
        traced(ScoringVariant::Full, breakdown)
    }
}

/// Clinical factors and age only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicHybridScorer;

impl HybridScorer for BasicHybridScorer {
    fn variant(&self) -> ScoringVariant {
        ScoringVariant::Basic
    }

    fn breakdown(&self, assessment: &PatientAssessment) -> ScoreBreakdown {
        let mut breakdown = ScoreBreakdown::new();
        push_binary_terms(&mut breakdown, assessment);
        traced(ScoringVariant::Basic, breakdown)
    }
}

/// Build the scorer selected by configuration.
pub fn scorer_for(config: &ScoringConfig) -> Box<dyn HybridScorer + Send + Sync> {
    match config.variant {
        ScoringVariant::Full => Box::new(FullHybridScorer {
            include_muscle_relaxant: config.include_muscle_relaxant,
        }),
        ScoringVariant::Basic => Box::new(BasicHybridScorer),
    }
}

/// Hybrid score with the default full scorer.
pub fn calculate_hybrid_score(assessment: &PatientAssessment) -> i32 {
    FullHybridScorer::default().score(assessment)
}

/// Itemized score with the default full scorer.
pub fn score_breakdown(assessment: &PatientAssessment) -> ScoreBreakdown {
    FullHybridScorer::default().breakdown(assessment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Age, ClinicalFactors, Dose, DrugDoses, MuscleRelaxant, MuscleRelaxantAgent, PropofolMode,
    };
    use proptest::prelude::*;

    fn baseline(age: i64) -> PatientAssessment {
        PatientAssessment::new(Age::new(age).unwrap())
    }

    #[test]
    fn test_empty_assessment_scores_zero() {
        assert_eq!(calculate_hybrid_score(&baseline(35)), 0);
    }

    #[test]
    fn test_age_term_is_strictly_over_50() {
        assert_eq!(calculate_hybrid_score(&baseline(50)), 0);
        assert_eq!(calculate_hybrid_score(&baseline(51)), 1);
    }

    #[test]
    fn test_full_breakdown_order() {
        let breakdown = score_breakdown(&baseline(60));
        let labels: Vec<String> = breakdown.labeled().into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels.len(), 24);
        assert_eq!(labels[0], "Female Gender");
        assert_eq!(labels[3], "Age");
        assert_eq!(labels[14], "Midazolam Dose");
        assert_eq!(labels[22], "Propofol Use");
        assert_eq!(labels[23], "Muscle Relaxant Used");
    }

    #[test]
    fn test_muscle_relaxant_toggle() {
        let mut assessment = baseline(35);
        assessment.muscle_relaxant =
            MuscleRelaxant::new(MuscleRelaxantAgent::Succinylcholine, Dose::new(1.5).unwrap());

        let with = FullHybridScorer::default();
        let without = FullHybridScorer {
            include_muscle_relaxant: false,
        };
        assert_eq!(with.score(&assessment), 2);
        assert_eq!(without.score(&assessment), 0);
        assert_eq!(without.breakdown(&assessment).get(Factor::MuscleRelaxant), None);
    }

    #[test]
    fn test_basic_scorer_ignores_drugs() {
        let mut assessment = baseline(60);
        assessment.factors = ClinicalFactors::default().with(ClinicalFactor::FemaleGender, true);
        assessment.doses = DrugDoses::default().with(Drug::Fentanyl, Dose::new(600.0).unwrap());
        assessment.propofol = PropofolMode::Tiva;

        assert_eq!(BasicHybridScorer.score(&assessment), 2);
        assert_eq!(BasicHybridScorer.breakdown(&assessment).len(), 14);
        assert_eq!(FullHybridScorer::default().score(&assessment), 2 + 3 - 3);
    }

    #[test]
    fn test_scorer_for_config() {
        let basic = scorer_for(&ScoringConfig {
            variant: ScoringVariant::Basic,
            include_muscle_relaxant: true,
        });
        assert_eq!(basic.variant(), ScoringVariant::Basic);

        let full = scorer_for(&ScoringConfig::default());
        assert_eq!(full.variant(), ScoringVariant::Full);
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!("Basic".parse::<ScoringVariant>().unwrap(), ScoringVariant::Basic);
        assert!("hybrid".parse::<ScoringVariant>().is_err());
    }

    fn arb_dose(max: f64) -> impl Strategy<Value = Dose> {
        prop_oneof![Just(0.0), 0.0..max].prop_map(|v| Dose::new(v).unwrap())
    }

    prop_compose! {
        fn arb_assessment()(
            flags in proptest::collection::vec(any::<bool>(), 13),
            age in 18i64..=80,
            doses in proptest::collection::vec(arb_dose(3000.0), 8),
            propofol in prop::sample::select(PropofolMode::ALL.to_vec()),
            agent in prop::sample::select(MuscleRelaxantAgent::ALL.to_vec()),
            relaxant_dose in arb_dose(5.0),
        ) -> PatientAssessment {
            let mut assessment = PatientAssessment::new(Age::new(age).unwrap());
            for (factor, flag) in ClinicalFactor::ALL.into_iter().zip(flags) {
                assessment.factors = assessment.factors.with(factor, flag);
            }
            for (drug, dose) in Drug::ALL.into_iter().zip(doses) {
                assessment.doses = assessment.doses.with(drug, dose);
            }
            assessment.propofol = propofol;
            assessment.muscle_relaxant = MuscleRelaxant::new(agent, relaxant_dose);
            assessment
        }
    }

    proptest! {
        #[test]
        fn prop_breakdown_sums_to_score(assessment in arb_assessment()) {
            for scorer in [
                scorer_for(&ScoringConfig::default()),
                scorer_for(&ScoringConfig { variant: ScoringVariant::Full, include_muscle_relaxant: false }),
                scorer_for(&ScoringConfig { variant: ScoringVariant::Basic, include_muscle_relaxant: true }),
            ] {
                prop_assert_eq!(scorer.breakdown(&assessment).total(), scorer.score(&assessment));
            }
        }

        #[test]
        fn prop_scoring_is_idempotent(assessment in arb_assessment()) {
            prop_assert_eq!(
                calculate_hybrid_score(&assessment),
                calculate_hybrid_score(&assessment)
            );
        }

        #[test]
        fn prop_basic_score_counts_binary_terms(assessment in arb_assessment()) {
            let expected = assessment.factors.count_present() as i32
                + i32::from(assessment.age.is_over_50());
            prop_assert_eq!(BasicHybridScorer.score(&assessment), expected);
        }
    }
}
