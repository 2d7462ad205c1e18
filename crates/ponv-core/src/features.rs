//! Fixed-order numeric encoding of an assessment for classifiers.
//!
//! Position carries meaning: trained models, the batch upload schema and the
//! persisted log all index into this layout.

use serde::{Deserialize, Serialize};

use crate::models::{
    Age, AssessmentError, AssessmentResult, ClinicalFactor, ClinicalFactors, Dose, Drug,
    DrugDoses, PatientAssessment, PropofolMode,
};
use crate::scoring::propofol_score;

pub const FEATURE_COUNT: usize = 23;

/// Column names, in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Female",
    "Non-Smoker",
    "History PONV",
    "Age",
    "Preop Anxiety",
    "Migraine",
    "Obesity",
    "Abdominal Surg",
    "ENT/Neuro/Ophthalmic",
    "Gynae/Breast Surg",
    "Surg >60min",
    "Blood Loss >500ml",
    "Volatile Agents",
    "Nitrous Oxide",
    "Midazolam (mg)",
    "Ondansetron (mg)",
    "Dexamethasone (mg)",
    "Glycopyrrolate (mg)",
    "Nalbuphine (mg)",
    "Fentanyl (mg)",
    "Butorphanol (mg)",
    "Pentazocine (mg)",
    "Propofol Score",
];

pub const AGE_INDEX: usize = 3;
pub const FIRST_DOSE_INDEX: usize = 14;
pub const FENTANYL_INDEX: usize = 19;
pub const PROPOFOL_INDEX: usize = 22;

/// Outcome column of an evaluation dataset.
pub const OUTCOME_COLUMN: &str = "PONV_Outcome";

/// Fentanyl is entered in mcg but encoded in mg.
const MCG_PER_MG: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    /// `(column name, value)` pairs in order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.into_iter().zip(self.0.iter().copied())
    }
}

/// Vector index of a clinical factor.
pub fn factor_index(factor: ClinicalFactor) -> usize {
    let position = ClinicalFactor::ALL
        .iter()
        .position(|f| *f == factor)
        .unwrap_or_default();
    if position < ClinicalFactor::BEFORE_AGE {
        position
    } else {
        position + 1
    }
}

/// Vector index of a drug dose.
pub fn drug_index(drug: Drug) -> usize {
    FIRST_DOSE_INDEX
        + Drug::ALL
            .iter()
            .position(|d| *d == drug)
            .unwrap_or_default()
}

fn encoded_dose(drug: Drug, dose: Dose) -> f64 {
    match drug {
        Drug::Fentanyl => dose.value() / MCG_PER_MG,
        _ => dose.value(),
    }
}

pub fn feature_vector(assessment: &PatientAssessment) -> FeatureVector {
    let mut values = [0.0; FEATURE_COUNT];
    for (factor, present) in assessment.factors.iter() {
        values[factor_index(factor)] = if present { 1.0 } else { 0.0 };
    }
    values[AGE_INDEX] = f64::from(assessment.age.years());
    for (drug, dose) in assessment.doses.iter() {
        values[drug_index(drug)] = encoded_dose(drug, dose);
    }
    values[PROPOFOL_INDEX] = f64::from(propofol_score(assessment.propofol));
    FeatureVector(values)
}

impl PatientAssessment {
    /// Rebuild an assessment from an encoded row.
    ///
    /// Propofol is recovered from its score; the muscle relaxant is not encoded
    /// and comes back as none.
    pub fn from_features(features: &FeatureVector) -> AssessmentResult<Self> {
        let mut factors = ClinicalFactors::default();
        for factor in ClinicalFactor::ALL {
            let index = factor_index(factor);
            let present = match features.0[index] {
                v if v == 1.0 => true,
                v if v == 0.0 => false,
                v => {
                    return Err(AssessmentError::invalid(
                        FEATURE_NAMES[index],
                        format!("expected 0 or 1, got {}", v),
                    ))
                }
            };
            factors = factors.with(factor, present);
        }

        let raw_age = features.0[AGE_INDEX];
        if raw_age.fract() != 0.0 || !raw_age.is_finite() {
            return Err(AssessmentError::invalid(
                FEATURE_NAMES[AGE_INDEX],
                format!("expected whole years, got {}", raw_age),
            ));
        }
        let age = Age::new(raw_age as i64).map_err(|_| {
            AssessmentError::invalid(
                FEATURE_NAMES[AGE_INDEX],
                format!("{} is outside [{}, {}]", raw_age, Age::MIN, Age::MAX),
            )
        })?;

        let mut doses = DrugDoses::default();
        for drug in Drug::ALL {
            let index = drug_index(drug);
            let raw = match drug {
                Drug::Fentanyl => features.0[index] * MCG_PER_MG,
                _ => features.0[index],
            };
            let dose =
                Dose::new(raw).map_err(|e| AssessmentError::invalid(FEATURE_NAMES[index], e))?;
            doses = doses.with(drug, dose);
        }

        let propofol = PropofolMode::ALL
            .into_iter()
            .find(|mode| f64::from(propofol_score(*mode)) == features.0[PROPOFOL_INDEX])
            .ok_or_else(|| {
                AssessmentError::invalid(
                    FEATURE_NAMES[PROPOFOL_INDEX],
                    format!("expected -3, -1 or 0, got {}", features.0[PROPOFOL_INDEX]),
                )
            })?;

        let mut assessment = PatientAssessment::new(age);
        assessment.factors = factors;
        assessment.doses = doses;
        assessment.propofol = propofol;
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PatientAssessment {
        let mut assessment = PatientAssessment::new(Age::new(62).unwrap());
        assessment.factors = ClinicalFactors::default()
            .with(ClinicalFactor::FemaleGender, true)
            .with(ClinicalFactor::PreopAnxiety, true)
            .with(ClinicalFactor::NitrousOxide, true);
        assessment.doses = DrugDoses::default()
            .with(Drug::Midazolam, Dose::new(2.0).unwrap())
            .with(Drug::Fentanyl, Dose::new(150.0).unwrap());
        assessment.propofol = PropofolMode::InductionOnly;
        assessment
    }

    #[test]
    fn test_layout() {
        let v = feature_vector(&sample());
        assert_eq!(v.as_slice().len(), FEATURE_COUNT);
        assert_eq!(v.0[0], 1.0);
        assert_eq!(v.0[AGE_INDEX], 62.0);
        assert_eq!(v.0[4], 1.0, "preop anxiety sits after age");
        assert_eq!(v.0[13], 1.0);
        assert_eq!(v.0[14], 2.0);
        assert_eq!(v.0[PROPOFOL_INDEX], -1.0);
    }

    #[test]
    fn test_fentanyl_is_encoded_in_mg() {
        let v = feature_vector(&sample());
        assert!((v.0[FENTANYL_INDEX] - 0.15).abs() < 1e-12);
        assert_eq!(FEATURE_NAMES[FENTANYL_INDEX], "Fentanyl (mg)");
    }

    #[test]
    fn test_factor_indices_skip_age() {
        assert_eq!(factor_index(ClinicalFactor::HistoryPonv), 2);
        assert_eq!(factor_index(ClinicalFactor::PreopAnxiety), 4);
        assert_eq!(factor_index(ClinicalFactor::NitrousOxide), 13);
        assert_eq!(drug_index(Drug::Pentazocine), 21);
    }

    #[test]
    fn test_named_columns() {
        let v = feature_vector(&sample());
        let (name, value) = v.named().nth(AGE_INDEX).unwrap();
        assert_eq!(name, "Age");
        assert_eq!(value, 62.0);
    }

    #[test]
    fn test_from_features_recovers_scored_inputs() {
        let original = sample();
        let rebuilt = PatientAssessment::from_features(&feature_vector(&original)).unwrap();
        assert_eq!(rebuilt.factors, original.factors);
        assert_eq!(rebuilt.age, original.age);
        assert_eq!(rebuilt.propofol, original.propofol);
        assert!((rebuilt.doses.fentanyl_mcg.value() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_features_rejects_bad_values() {
        let mut v = feature_vector(&sample());
        v.0[1] = 0.5;
        assert!(PatientAssessment::from_features(&v).is_err());

        let mut v = feature_vector(&sample());
        v.0[AGE_INDEX] = 44.5;
        assert!(PatientAssessment::from_features(&v).is_err());

        let mut v = feature_vector(&sample());
        v.0[PROPOFOL_INDEX] = -2.0;
        assert!(PatientAssessment::from_features(&v).is_err());

        let mut v = feature_vector(&sample());
        v.0[15] = -1.0;
        assert!(PatientAssessment::from_features(&v).is_err());
    }
}
