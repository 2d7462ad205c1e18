//! Patient assessment: the immutable input of one scoring run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::drug::{
    Dose, DoseError, Drug, DrugDoses, MuscleRelaxant, MuscleRelaxantAgent, PropofolDoses,
    PropofolMode,
};
use super::labels::closest_label;

/// Assessment validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssessmentError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unrecognized {field} '{value}'{}", suggestion_hint(.suggestion))]
    UnrecognizedLabel {
        field: String,
        value: String,
        suggestion: Option<String>,
    },
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(label) => format!(" (did you mean '{}'?)", label),
        None => String::new(),
    }
}

impl AssessmentError {
    pub(crate) fn invalid(field: &str, reason: impl fmt::Display) -> Self {
        AssessmentError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type AssessmentResult<T> = Result<T, AssessmentError>;

/// A Yes/No form answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AnswerInput")]
pub enum Answer {
    Yes,
    No,
}

/// An answer as submitted: a JSON boolean or a Yes/No label.
///
/// Kept unparsed in [`AssessmentInput`] so a bad label is reported against
/// the form field it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerInput {
    Flag(bool),
    Text(String),
}

impl AnswerInput {
    /// Parse the answer given for `field`.
    pub fn parse_for(&self, field: &str) -> AssessmentResult<Answer> {
        match self {
            AnswerInput::Flag(flag) => Ok(Answer::from(*flag)),
            AnswerInput::Text(text) => text.parse().map_err(|_| AssessmentError::UnrecognizedLabel {
                field: field.to_string(),
                value: text.clone(),
                suggestion: closest_label(text, [Answer::Yes.label(), Answer::No.label()]),
            }),
        }
    }
}

impl From<Answer> for AnswerInput {
    fn from(answer: Answer) -> Self {
        AnswerInput::Text(answer.label().to_string())
    }
}

impl TryFrom<AnswerInput> for Answer {
    type Error = AssessmentError;

    fn try_from(raw: AnswerInput) -> Result<Self, Self::Error> {
        raw.parse_for("answer")
    }
}

impl Answer {
    pub fn is_yes(self) -> bool {
        matches!(self, Answer::Yes)
    }

    pub fn label(self) -> &'static str {
        match self {
            Answer::Yes => "Yes",
            Answer::No => "No",
        }
    }
}

impl From<bool> for Answer {
    fn from(flag: bool) -> Self {
        if flag {
            Answer::Yes
        } else {
            Answer::No
        }
    }
}

impl FromStr for Answer {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Answer::Yes),
            "no" => Ok(Answer::No),
            _ => Err(AssessmentError::UnrecognizedLabel {
                field: "answer".into(),
                value: s.to_string(),
                suggestion: None,
            }),
        }
    }
}

/// Patient age in years, within the form's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Age(u8);

impl Age {
    pub const MIN: u8 = 18;
    pub const MAX: u8 = 80;

    /// Age strictly above this adds one point.
    pub const RISK_THRESHOLD: u8 = 50;

    pub fn new(years: i64) -> AssessmentResult<Self> {
        if years < i64::from(Self::MIN) || years > i64::from(Self::MAX) {
            return Err(AssessmentError::invalid(
                "age",
                format!("{} is outside [{}, {}]", years, Self::MIN, Self::MAX),
            ));
        }
        Ok(Age(years as u8))
    }

    pub fn years(self) -> u8 {
        self.0
    }

    pub fn is_over_50(self) -> bool {
        self.0 > Self::RISK_THRESHOLD
    }
}

impl TryFrom<i64> for Age {
    type Error = AssessmentError;

    fn try_from(years: i64) -> Result<Self, Self::Error> {
        Age::new(years)
    }
}

impl From<Age> for i64 {
    fn from(age: Age) -> Self {
        i64::from(age.0)
    }
}

/// The boolean clinical factors, each worth one point when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalFactor {
    FemaleGender,
    NonSmoker,
    HistoryPonv,
    PreopAnxiety,
    HistoryMigraine,
    Obesity,
    AbdominalSurgery,
    EntSurgery,
    GynaeSurgery,
    SurgeryOver60Min,
    MajorBloodLoss,
    VolatileAgents,
    NitrousOxide,
}

impl ClinicalFactor {
    /// All factors, in breakdown/feature order (age sits after `HistoryPonv`).
    pub const ALL: [ClinicalFactor; 13] = [
        ClinicalFactor::FemaleGender,
        ClinicalFactor::NonSmoker,
        ClinicalFactor::HistoryPonv,
        ClinicalFactor::PreopAnxiety,
        ClinicalFactor::HistoryMigraine,
        ClinicalFactor::Obesity,
        ClinicalFactor::AbdominalSurgery,
        ClinicalFactor::EntSurgery,
        ClinicalFactor::GynaeSurgery,
        ClinicalFactor::SurgeryOver60Min,
        ClinicalFactor::MajorBloodLoss,
        ClinicalFactor::VolatileAgents,
        ClinicalFactor::NitrousOxide,
    ];

    /// Number of factors listed before the age term.
    pub const BEFORE_AGE: usize = 3;

    /// Clinician-facing label.
    pub fn label(self) -> &'static str {
        match self {
            ClinicalFactor::FemaleGender => "Female Gender",
            ClinicalFactor::NonSmoker => "Non-Smoker",
            ClinicalFactor::HistoryPonv => "History of PONV or Motion Sickness",
            ClinicalFactor::PreopAnxiety => "Preoperative Anxiety",
            ClinicalFactor::HistoryMigraine => "History of Migraine",
            ClinicalFactor::Obesity => "BMI > 30",
            ClinicalFactor::AbdominalSurgery => "Abdominal or Laparoscopic Surgery",
            ClinicalFactor::EntSurgery => "ENT/Neurosurgery/Ophthalmic Surgery",
            ClinicalFactor::GynaeSurgery => "Gynecological or Breast Surgery",
            ClinicalFactor::SurgeryOver60Min => "Surgery Duration > 60 min",
            ClinicalFactor::MajorBloodLoss => "Major Blood Loss > 500 mL",
            ClinicalFactor::VolatileAgents => "Use of Volatile Agents (Sevo/Iso/Des)",
            ClinicalFactor::NitrousOxide => "Use of Nitrous Oxide",
        }
    }

    /// Input field carrying this factor.
    pub fn field_name(self) -> &'static str {
        match self {
            ClinicalFactor::FemaleGender => "female_gender",
            ClinicalFactor::NonSmoker => "non_smoker",
            ClinicalFactor::HistoryPonv => "history_ponv",
            ClinicalFactor::PreopAnxiety => "preop_anxiety",
            ClinicalFactor::HistoryMigraine => "history_migraine",
            ClinicalFactor::Obesity => "obesity",
            ClinicalFactor::AbdominalSurgery => "abdominal_surgery",
            ClinicalFactor::EntSurgery => "ent_surgery",
            ClinicalFactor::GynaeSurgery => "gynae_surgery",
            ClinicalFactor::SurgeryOver60Min => "surgery_over_60_min",
            ClinicalFactor::MajorBloodLoss => "major_blood_loss",
            ClinicalFactor::VolatileAgents => "volatile_agents",
            ClinicalFactor::NitrousOxide => "nitrous_oxide",
        }
    }
}

/// Presence of each clinical factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ClinicalFactors {
    pub female_gender: bool,
    pub non_smoker: bool,
    pub history_ponv: bool,
    pub preop_anxiety: bool,
    pub history_migraine: bool,
    pub obesity: bool,
    pub abdominal_surgery: bool,
    pub ent_surgery: bool,
    pub gynae_surgery: bool,
    pub surgery_over_60_min: bool,
    pub major_blood_loss: bool,
    pub volatile_agents: bool,
    pub nitrous_oxide: bool,
}

impl ClinicalFactors {
    /// Every factor present.
    pub fn all() -> Self {
        ClinicalFactor::ALL
            .into_iter()
            .fold(Self::default(), |acc, factor| acc.with(factor, true))
    }

    pub fn get(&self, factor: ClinicalFactor) -> bool {
        match factor {
            ClinicalFactor::FemaleGender => self.female_gender,
            ClinicalFactor::NonSmoker => self.non_smoker,
            ClinicalFactor::HistoryPonv => self.history_ponv,
            ClinicalFactor::PreopAnxiety => self.preop_anxiety,
            ClinicalFactor::HistoryMigraine => self.history_migraine,
            ClinicalFactor::Obesity => self.obesity,
            ClinicalFactor::AbdominalSurgery => self.abdominal_surgery,
            ClinicalFactor::EntSurgery => self.ent_surgery,
            ClinicalFactor::GynaeSurgery => self.gynae_surgery,
            ClinicalFactor::SurgeryOver60Min => self.surgery_over_60_min,
            ClinicalFactor::MajorBloodLoss => self.major_blood_loss,
            ClinicalFactor::VolatileAgents => self.volatile_agents,
            ClinicalFactor::NitrousOxide => self.nitrous_oxide,
        }
    }

    pub fn with(mut self, factor: ClinicalFactor, present: bool) -> Self {
        let slot = match factor {
            ClinicalFactor::FemaleGender => &mut self.female_gender,
            ClinicalFactor::NonSmoker => &mut self.non_smoker,
            ClinicalFactor::HistoryPonv => &mut self.history_ponv,
            ClinicalFactor::PreopAnxiety => &mut self.preop_anxiety,
            ClinicalFactor::HistoryMigraine => &mut self.history_migraine,
            ClinicalFactor::Obesity => &mut self.obesity,
            ClinicalFactor::AbdominalSurgery => &mut self.abdominal_surgery,
            ClinicalFactor::EntSurgery => &mut self.ent_surgery,
            ClinicalFactor::GynaeSurgery => &mut self.gynae_surgery,
            ClinicalFactor::SurgeryOver60Min => &mut self.surgery_over_60_min,
            ClinicalFactor::MajorBloodLoss => &mut self.major_blood_loss,
            ClinicalFactor::VolatileAgents => &mut self.volatile_agents,
            ClinicalFactor::NitrousOxide => &mut self.nitrous_oxide,
        };
        *slot = present;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClinicalFactor, bool)> + '_ {
        ClinicalFactor::ALL
            .into_iter()
            .map(move |factor| (factor, self.get(factor)))
    }

    pub fn count_present(&self) -> usize {
        self.iter().filter(|(_, present)| *present).count()
    }
}

/// One patient's validated inputs.
///
/// Constructed fresh for each evaluation and never mutated; scores, categories
/// and feature vectors are all derived from it on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientAssessment {
    pub factors: ClinicalFactors,
    pub age: Age,
    pub doses: DrugDoses,
    pub propofol: PropofolMode,
    /// Display-only propofol doses
    #[serde(default)]
    pub propofol_doses: PropofolDoses,
    pub muscle_relaxant: MuscleRelaxant,
}

impl PatientAssessment {
    /// An assessment with no factors present and no drugs given.
    pub fn new(age: Age) -> Self {
        Self {
            factors: ClinicalFactors::default(),
            age,
            doses: DrugDoses::default(),
            propofol: PropofolMode::None,
            propofol_doses: PropofolDoses::default(),
            muscle_relaxant: MuscleRelaxant::none(),
        }
    }

    /// Doses above the form's bounds. They are scored in the maximal tier.
    pub fn doses_above_input_bounds(&self) -> Vec<(Drug, Dose)> {
        self.doses
            .iter()
            .filter(|(drug, dose)| dose.value() > drug.input_max())
            .collect()
    }

    /// Canonical JSON for hashing and logging.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Raw form submission. Every field is optional on the wire so that missing
/// answers can be reported together instead of defaulting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssessmentInput {
    pub female_gender: Option<AnswerInput>,
    pub non_smoker: Option<AnswerInput>,
    pub history_ponv: Option<AnswerInput>,
    pub age: Option<i64>,
    pub preop_anxiety: Option<AnswerInput>,
    pub history_migraine: Option<AnswerInput>,
    pub obesity: Option<AnswerInput>,
    pub abdominal_surgery: Option<AnswerInput>,
    pub ent_surgery: Option<AnswerInput>,
    pub gynae_surgery: Option<AnswerInput>,
    pub surgery_over_60_min: Option<AnswerInput>,
    pub major_blood_loss: Option<AnswerInput>,
    pub volatile_agents: Option<AnswerInput>,
    pub nitrous_oxide: Option<AnswerInput>,
    pub midazolam_mg: Option<f64>,
    pub ondansetron_mg: Option<f64>,
    pub dexamethasone_mg: Option<f64>,
    pub glycopyrrolate_mg: Option<f64>,
    pub nalbuphine_mg: Option<f64>,
    pub fentanyl_mcg: Option<f64>,
    pub butorphanol_mg: Option<f64>,
    pub pentazocine_mg: Option<f64>,
    pub propofol_mode: Option<String>,
    pub propofol_tiva_mg_per_hr: Option<f64>,
    pub propofol_induction_mg_per_kg: Option<f64>,
    pub muscle_relaxant: Option<String>,
    pub muscle_relaxant_mg_per_kg: Option<f64>,
}

impl AssessmentInput {
    fn answer(&self, factor: ClinicalFactor) -> Option<&AnswerInput> {
        let answer = match factor {
            ClinicalFactor::FemaleGender => &self.female_gender,
            ClinicalFactor::NonSmoker => &self.non_smoker,
            ClinicalFactor::HistoryPonv => &self.history_ponv,
            ClinicalFactor::PreopAnxiety => &self.preop_anxiety,
            ClinicalFactor::HistoryMigraine => &self.history_migraine,
            ClinicalFactor::Obesity => &self.obesity,
            ClinicalFactor::AbdominalSurgery => &self.abdominal_surgery,
            ClinicalFactor::EntSurgery => &self.ent_surgery,
            ClinicalFactor::GynaeSurgery => &self.gynae_surgery,
            ClinicalFactor::SurgeryOver60Min => &self.surgery_over_60_min,
            ClinicalFactor::MajorBloodLoss => &self.major_blood_loss,
            ClinicalFactor::VolatileAgents => &self.volatile_agents,
            ClinicalFactor::NitrousOxide => &self.nitrous_oxide,
        };
        answer.as_ref()
    }

    fn dose(&self, drug: Drug) -> Option<f64> {
        match drug {
            Drug::Midazolam => self.midazolam_mg,
            Drug::Ondansetron => self.ondansetron_mg,
            Drug::Dexamethasone => self.dexamethasone_mg,
            Drug::Glycopyrrolate => self.glycopyrrolate_mg,
            Drug::Nalbuphine => self.nalbuphine_mg,
            Drug::Fentanyl => self.fentanyl_mcg,
            Drug::Butorphanol => self.butorphanol_mg,
            Drug::Pentazocine => self.pentazocine_mg,
        }
    }

    /// Names of every required field that is absent.
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for factor in ClinicalFactor::ALL {
            if self.answer(factor).is_none() {
                missing.push(factor.field_name().to_string());
            }
        }
        if self.age.is_none() {
            missing.push("age".into());
        }
        for drug in Drug::ALL {
            if self.dose(drug).is_none() {
                missing.push(drug.field_name().to_string());
            }
        }
        if self.propofol_mode.is_none() {
            missing.push("propofol_mode".into());
        }
        match self.muscle_relaxant.as_deref() {
            None => missing.push("muscle_relaxant".into()),
            // The dose only matters once an agent was given
            Some(agent) if !agent.trim().eq_ignore_ascii_case("none") => {
                if self.muscle_relaxant_mg_per_kg.is_none() {
                    missing.push("muscle_relaxant_mg_per_kg".into());
                }
            }
            Some(_) => {}
        }
        missing
    }
}

fn validated_dose(field: &str, raw: f64) -> AssessmentResult<Dose> {
    Dose::new(raw).map_err(|e: DoseError| AssessmentError::invalid(field, e))
}

fn optional_dose(field: &str, raw: Option<f64>) -> AssessmentResult<Option<Dose>> {
    raw.map(|value| validated_dose(field, value)).transpose()
}

impl TryFrom<AssessmentInput> for PatientAssessment {
    type Error = AssessmentError;

    fn try_from(input: AssessmentInput) -> AssessmentResult<Self> {
        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Err(AssessmentError::MissingFields(missing));
        }

        let mut factors = ClinicalFactors::default();
        for factor in ClinicalFactor::ALL {
            let present = match input.answer(factor) {
                Some(raw) => raw.parse_for(factor.field_name())?.is_yes(),
                None => false,
            };
            factors = factors.with(factor, present);
        }

        let age = Age::new(input.age.unwrap_or_default())?;

        let mut doses = DrugDoses::default();
        for drug in Drug::ALL {
            let raw = input.dose(drug).unwrap_or_default();
            doses = doses.with(drug, validated_dose(drug.field_name(), raw)?);
        }

        let propofol: PropofolMode = input.propofol_mode.as_deref().unwrap_or_default().parse()?;
        let propofol_doses = PropofolDoses {
            tiva_mg_per_hr: optional_dose("propofol_tiva_mg_per_hr", input.propofol_tiva_mg_per_hr)?,
            induction_mg_per_kg: optional_dose(
                "propofol_induction_mg_per_kg",
                input.propofol_induction_mg_per_kg,
            )?,
        };

        let agent: MuscleRelaxantAgent =
            input.muscle_relaxant.as_deref().unwrap_or_default().parse()?;
        let relaxant_dose = optional_dose("muscle_relaxant_mg_per_kg", input.muscle_relaxant_mg_per_kg)?
            .unwrap_or(Dose::ZERO);

        let assessment = PatientAssessment {
            factors,
            age,
            doses,
            propofol,
            propofol_doses,
            muscle_relaxant: MuscleRelaxant::new(agent, relaxant_dose),
        };

        for (drug, dose) in assessment.doses_above_input_bounds() {
            tracing::warn!(
                drug = drug.name(),
                dose = dose.value(),
                unit = drug.unit(),
                bound = drug.input_max(),
                "dose above form bound, scoring in maximal tier"
            );
        }
        if assessment.muscle_relaxant.above_input_bound() {
            tracing::warn!(
                agent = assessment.muscle_relaxant.agent.label(),
                dose = assessment.muscle_relaxant.dose_mg_per_kg.value(),
                unit = "mg/kg",
                bound = MuscleRelaxant::INPUT_MAX_MG_PER_KG,
                "muscle relaxant dose above form bound, scoring in maximal tier"
            );
        }

        Ok(assessment)
    }
}

impl From<&PatientAssessment> for AssessmentInput {
    fn from(assessment: &PatientAssessment) -> Self {
        let answer = |factor: ClinicalFactor| {
            Some(AnswerInput::from(Answer::from(assessment.factors.get(factor))))
        };
        let dose = |drug: Drug| Some(assessment.doses.get(drug).value());
        AssessmentInput {
            female_gender: answer(ClinicalFactor::FemaleGender),
            non_smoker: answer(ClinicalFactor::NonSmoker),
            history_ponv: answer(ClinicalFactor::HistoryPonv),
            age: Some(i64::from(assessment.age)),
            preop_anxiety: answer(ClinicalFactor::PreopAnxiety),
            history_migraine: answer(ClinicalFactor::HistoryMigraine),
            obesity: answer(ClinicalFactor::Obesity),
            abdominal_surgery: answer(ClinicalFactor::AbdominalSurgery),
            ent_surgery: answer(ClinicalFactor::EntSurgery),
            gynae_surgery: answer(ClinicalFactor::GynaeSurgery),
            surgery_over_60_min: answer(ClinicalFactor::SurgeryOver60Min),
            major_blood_loss: answer(ClinicalFactor::MajorBloodLoss),
            volatile_agents: answer(ClinicalFactor::VolatileAgents),
            nitrous_oxide: answer(ClinicalFactor::NitrousOxide),
            midazolam_mg: dose(Drug::Midazolam),
            ondansetron_mg: dose(Drug::Ondansetron),
            dexamethasone_mg: dose(Drug::Dexamethasone),
            glycopyrrolate_mg: dose(Drug::Glycopyrrolate),
            nalbuphine_mg: dose(Drug::Nalbuphine),
            fentanyl_mcg: dose(Drug::Fentanyl),
            butorphanol_mg: dose(Drug::Butorphanol),
            pentazocine_mg: dose(Drug::Pentazocine),
            propofol_mode: Some(assessment.propofol.label().to_string()),
            propofol_tiva_mg_per_hr: assessment.propofol_doses.tiva_mg_per_hr.map(Dose::value),
            propofol_induction_mg_per_kg: assessment
                .propofol_doses
                .induction_mg_per_kg
                .map(Dose::value),
            muscle_relaxant: Some(assessment.muscle_relaxant.agent.label().to_string()),
            muscle_relaxant_mg_per_kg: Some(assessment.muscle_relaxant.dose_mg_per_kg.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_input() -> AssessmentInput {
        let baseline = PatientAssessment::new(Age::new(35).unwrap());
        AssessmentInput::from(&baseline)
    }

    #[test]
    fn test_age_domain() {
        assert!(Age::new(18).is_ok());
        assert!(Age::new(80).is_ok());
        assert!(Age::new(17).is_err());
        assert!(Age::new(81).is_err());
        assert!(!Age::new(50).unwrap().is_over_50());
        assert!(Age::new(51).unwrap().is_over_50());
    }

    #[test]
    fn test_answer_parsing() {
        assert_eq!("Yes".parse::<Answer>().unwrap(), Answer::Yes);
        assert_eq!(" no ".parse::<Answer>().unwrap(), Answer::No);
        assert!("maybe".parse::<Answer>().is_err());

        let from_json: Answer = serde_json::from_str("\"YES\"").unwrap();
        assert_eq!(from_json, Answer::Yes);
        let from_bool: Answer = serde_json::from_str("false").unwrap();
        assert_eq!(from_bool, Answer::No);
    }

    #[test]
    fn test_bad_answer_names_its_field() {
        let mut input = complete_input();
        input.history_ponv = Some(AnswerInput::Text("maybe".into()));
        let err = PatientAssessment::try_from(input).unwrap_err();
        assert_eq!(
            err,
            AssessmentError::UnrecognizedLabel {
                field: "history_ponv".into(),
                value: "maybe".into(),
                suggestion: None,
            }
        );
        assert_eq!(err.to_string(), "Unrecognized history_ponv 'maybe'");

        let json = r#"{"female_gender": "ye"}"#;
        let input: AssessmentInput = serde_json::from_str(json).unwrap();
        let mut complete = complete_input();
        complete.female_gender = input.female_gender;
        match PatientAssessment::try_from(complete).unwrap_err() {
            AssessmentError::UnrecognizedLabel {
                field, suggestion, ..
            } => {
                assert_eq!(field, "female_gender");
                assert_eq!(suggestion.as_deref(), Some("Yes"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_complete_input_converts() {
        let assessment = PatientAssessment::try_from(complete_input()).unwrap();
        assert_eq!(assessment.age.years(), 35);
        assert_eq!(assessment.factors.count_present(), 0);
        assert_eq!(assessment.propofol, PropofolMode::None);
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let mut input = complete_input();
        input.female_gender = None;
        input.fentanyl_mcg = None;
        input.propofol_mode = None;

        let err = PatientAssessment::try_from(input).unwrap_err();
        assert_eq!(
            err,
            AssessmentError::MissingFields(vec![
                "female_gender".into(),
                "fentanyl_mcg".into(),
                "propofol_mode".into(),
            ])
        );
    }

    #[test]
    fn test_empty_input_is_rejected_not_defaulted() {
        let err = PatientAssessment::try_from(AssessmentInput::default()).unwrap_err();
        match err {
            AssessmentError::MissingFields(fields) => {
                // 13 factors + age + 8 doses + propofol mode + muscle relaxant
                assert_eq!(fields.len(), 24);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_relaxant_dose_required_only_when_agent_given() {
        let mut input = complete_input();
        input.muscle_relaxant_mg_per_kg = None;
        assert!(PatientAssessment::try_from(input.clone()).is_ok());

        input.muscle_relaxant = Some("Rocuronium".into());
        let err = PatientAssessment::try_from(input).unwrap_err();
        assert_eq!(
            err,
            AssessmentError::MissingFields(vec!["muscle_relaxant_mg_per_kg".into()])
        );
    }

    #[test]
    fn test_negative_dose_is_rejected() {
        let mut input = complete_input();
        input.ondansetron_mg = Some(-4.0);
        let err = PatientAssessment::try_from(input).unwrap_err();
        assert!(matches!(err, AssessmentError::InvalidValue { ref field, .. } if field == "ondansetron_mg"));
    }

    #[test]
    fn test_out_of_range_age_is_rejected() {
        let mut input = complete_input();
        input.age = Some(90);
        assert!(matches!(
            PatientAssessment::try_from(input),
            Err(AssessmentError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_categorical_label_is_rejected() {
        let mut input = complete_input();
        input.propofol_mode = Some("Sevoflurane".into());
        assert!(matches!(
            PatientAssessment::try_from(input),
            Err(AssessmentError::UnrecognizedLabel { .. })
        ));
    }

    #[test]
    fn test_above_bound_dose_is_accepted() {
        let mut input = complete_input();
        input.fentanyl_mcg = Some(5000.0);
        let assessment = PatientAssessment::try_from(input).unwrap();
        assert_eq!(
            assessment.doses_above_input_bounds(),
            vec![(Drug::Fentanyl, Dose::new(5000.0).unwrap())]
        );
    }

    #[test]
    fn test_input_json_round_trip_of_form_fields() {
        let json = r#"{
            "female_gender": "Yes", "non_smoker": "Yes", "history_ponv": "No", "age": 60,
            "preop_anxiety": "No", "history_migraine": "No", "obesity": "No",
            "abdominal_surgery": "No", "ent_surgery": "No", "gynae_surgery": "No",
            "surgery_over_60_min": "No", "major_blood_loss": "No", "volatile_agents": "No",
            "nitrous_oxide": "No", "midazolam_mg": 0, "ondansetron_mg": 4, "dexamethasone_mg": 0,
            "glycopyrrolate_mg": 0, "nalbuphine_mg": 0, "fentanyl_mcg": 100, "butorphanol_mg": 0,
            "pentazocine_mg": 0, "propofol_mode": "TIVA", "propofol_tiva_mg_per_hr": 120,
            "muscle_relaxant": "None"
        }"#;
        let input: AssessmentInput = serde_json::from_str(json).unwrap();
        let assessment = PatientAssessment::try_from(input).unwrap();
        assert!(assessment.factors.female_gender);
        assert!(assessment.factors.non_smoker);
        assert_eq!(assessment.propofol, PropofolMode::Tiva);
        assert_eq!(
            assessment.propofol_doses.tiva_mg_per_hr,
            Some(Dose::new(120.0).unwrap())
        );
    }

    #[test]
    fn test_unknown_input_field_is_rejected() {
        let json = r#"{"female": "Yes"}"#;
        assert!(serde_json::from_str::<AssessmentInput>(json).is_err());
    }
}
