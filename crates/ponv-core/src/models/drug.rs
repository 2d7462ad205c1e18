//! Drug, dose and anesthetic-technique models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::labels::closest_label;
use super::AssessmentError;

/// Why a raw number is not a usable dose.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DoseError {
    #[error("dose must be non-negative, got {0}")]
    Negative(f64),

    #[error("dose must be a finite number")]
    NotFinite,
}

/// A validated, non-negative, finite dose.
///
/// The unit depends on where the dose is used (mg, mcg, mg/kg). Values above the
/// application's input bounds are still valid doses.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Dose(f64);

impl Dose {
    /// No drug given.
    pub const ZERO: Dose = Dose(0.0);

    /// Validate a raw dose.
    pub fn new(value: f64) -> Result<Self, DoseError> {
        if !value.is_finite() {
            return Err(DoseError::NotFinite);
        }
        if value < 0.0 {
            return Err(DoseError::Negative(value));
        }
        // Normalise -0.0 so equality with ZERO holds
        Ok(Dose(value + 0.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl TryFrom<f64> for Dose {
    type Error = DoseError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Dose::new(value)
    }
}

impl From<Dose> for f64 {
    fn from(dose: Dose) -> Self {
        dose.0
    }
}

impl fmt::Display for Dose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The eight drugs with a dose-response contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Drug {
    Midazolam,
    Ondansetron,
    Dexamethasone,
    Glycopyrrolate,
    Nalbuphine,
    Fentanyl,
    Butorphanol,
    Pentazocine,
}

impl Drug {
    /// All scored drugs, in feature-vector order.
    pub const ALL: [Drug; 8] = [
        Drug::Midazolam,
        Drug::Ondansetron,
        Drug::Dexamethasone,
        Drug::Glycopyrrolate,
        Drug::Nalbuphine,
        Drug::Fentanyl,
        Drug::Butorphanol,
        Drug::Pentazocine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Drug::Midazolam => "Midazolam",
            Drug::Ondansetron => "Ondansetron",
            Drug::Dexamethasone => "Dexamethasone",
            Drug::Glycopyrrolate => "Glycopyrrolate",
            Drug::Nalbuphine => "Nalbuphine",
            Drug::Fentanyl => "Fentanyl",
            Drug::Butorphanol => "Butorphanol",
            Drug::Pentazocine => "Pentazocine",
        }
    }

    /// Unit the dose is entered in.
    pub fn unit(self) -> &'static str {
        match self {
            Drug::Fentanyl => "mcg",
            _ => "mg",
        }
    }

    /// Upper bound the entry form enforces. Scoring does not rely on it.
    pub fn input_max(self) -> f64 {
        match self {
            Drug::Midazolam => 20.0,
            Drug::Ondansetron => 24.0,
            Drug::Dexamethasone => 40.0,
            Drug::Glycopyrrolate => 0.4,
            Drug::Nalbuphine => 20.0,
            Drug::Fentanyl => 2000.0,
            Drug::Butorphanol => 4.0,
            Drug::Pentazocine => 360.0,
        }
    }

    /// Input field carrying this drug's dose.
    pub fn field_name(self) -> &'static str {
        match self {
            Drug::Midazolam => "midazolam_mg",
            Drug::Ondansetron => "ondansetron_mg",
            Drug::Dexamethasone => "dexamethasone_mg",
            Drug::Glycopyrrolate => "glycopyrrolate_mg",
            Drug::Nalbuphine => "nalbuphine_mg",
            Drug::Fentanyl => "fentanyl_mcg",
            Drug::Butorphanol => "butorphanol_mg",
            Drug::Pentazocine => "pentazocine_mg",
        }
    }

    /// Whether the drug lowers PONV risk.
    pub fn is_protective(self) -> bool {
        matches!(
            self,
            Drug::Midazolam | Drug::Ondansetron | Drug::Dexamethasone
        )
    }

    /// Counted by the `opioid` column of the log CSV export.
    pub fn is_opioid(self) -> bool {
        matches!(
            self,
            Drug::Nalbuphine | Drug::Fentanyl | Drug::Butorphanol | Drug::Pentazocine
        )
    }
}

impl fmt::Display for Drug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Doses of every scored drug.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DrugDoses {
    pub midazolam_mg: Dose,
    pub ondansetron_mg: Dose,
    pub dexamethasone_mg: Dose,
    pub glycopyrrolate_mg: Dose,
    pub nalbuphine_mg: Dose,
    pub fentanyl_mcg: Dose,
    pub butorphanol_mg: Dose,
    pub pentazocine_mg: Dose,
}

impl DrugDoses {
    /// Dose for a drug, in the drug's input unit.
    pub fn get(&self, drug: Drug) -> Dose {
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

    /// Set a drug's dose, returning the updated set.
    pub fn with(mut self, drug: Drug, dose: Dose) -> Self {
        let slot = match drug {
            Drug::Midazolam => &mut self.midazolam_mg,
            Drug::Ondansetron => &mut self.ondansetron_mg,
            Drug::Dexamethasone => &mut self.dexamethasone_mg,
            Drug::Glycopyrrolate => &mut self.glycopyrrolate_mg,
            Drug::Nalbuphine => &mut self.nalbuphine_mg,
            Drug::Fentanyl => &mut self.fentanyl_mcg,
            Drug::Butorphanol => &mut self.butorphanol_mg,
            Drug::Pentazocine => &mut self.pentazocine_mg,
        };
        *slot = dose;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Drug, Dose)> + '_ {
        Drug::ALL.into_iter().map(move |drug| (drug, self.get(drug)))
    }

    /// Whether any opioid was given.
    pub fn any_opioid(&self) -> bool {
        self.iter()
            .any(|(drug, dose)| drug.is_opioid() && !dose.is_zero())
    }
}

/// How propofol was used. A category, not a dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PropofolMode {
    #[default]
    None,
    #[serde(rename = "Induction Only")]
    InductionOnly,
    #[serde(rename = "TIVA")]
    Tiva,
}

impl PropofolMode {
    pub const ALL: [PropofolMode; 3] = [
        PropofolMode::None,
        PropofolMode::InductionOnly,
        PropofolMode::Tiva,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PropofolMode::None => "None",
            PropofolMode::InductionOnly => "Induction Only",
            PropofolMode::Tiva => "TIVA",
        }
    }
}

impl fmt::Display for PropofolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PropofolMode {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        PropofolMode::ALL
            .into_iter()
            .find(|mode| mode.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| AssessmentError::UnrecognizedLabel {
                field: "propofol_mode".into(),
                value: s.to_string(),
                suggestion: closest_label(s, PropofolMode::ALL.map(PropofolMode::label)),
            })
    }
}

/// Propofol dose fields shown on the form. Display only; never scored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PropofolDoses {
    /// TIVA infusion rate (mg/hr)
    pub tiva_mg_per_hr: Option<Dose>,
    /// Induction bolus (mg/kg)
    pub induction_mg_per_kg: Option<Dose>,
}

/// Neuromuscular blocking agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MuscleRelaxantAgent {
    #[default]
    None,
    Succinylcholine,
    Rocuronium,
    Vecuronium,
    Atracurium,
    Cisatracurium,
}

impl MuscleRelaxantAgent {
    pub const ALL: [MuscleRelaxantAgent; 6] = [
        MuscleRelaxantAgent::None,
        MuscleRelaxantAgent::Succinylcholine,
        MuscleRelaxantAgent::Rocuronium,
        MuscleRelaxantAgent::Vecuronium,
        MuscleRelaxantAgent::Atracurium,
        MuscleRelaxantAgent::Cisatracurium,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MuscleRelaxantAgent::None => "None",
            MuscleRelaxantAgent::Succinylcholine => "Succinylcholine",
            MuscleRelaxantAgent::Rocuronium => "Rocuronium",
            MuscleRelaxantAgent::Vecuronium => "Vecuronium",
            MuscleRelaxantAgent::Atracurium => "Atracurium",
            MuscleRelaxantAgent::Cisatracurium => "Cisatracurium",
        }
    }
}

impl fmt::Display for MuscleRelaxantAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MuscleRelaxantAgent {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        MuscleRelaxantAgent::ALL
            .into_iter()
            .find(|agent| agent.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| AssessmentError::UnrecognizedLabel {
                field: "muscle_relaxant".into(),
                value: s.to_string(),
                suggestion: closest_label(s, MuscleRelaxantAgent::ALL.map(MuscleRelaxantAgent::label)),
            })
    }
}

/// Muscle relaxant choice with its dose.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MuscleRelaxant {
    pub agent: MuscleRelaxantAgent,
    /// Dose in mg/kg (form bound 5.0)
    pub dose_mg_per_kg: Dose,
}

impl MuscleRelaxant {
    /// Form bound for the mg/kg dose.
    pub const INPUT_MAX_MG_PER_KG: f64 = 5.0;

    pub fn new(agent: MuscleRelaxantAgent, dose_mg_per_kg: Dose) -> Self {
        Self {
            agent,
            dose_mg_per_kg,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Dose above [`Self::INPUT_MAX_MG_PER_KG`]; still scored in the top tier.
    pub fn above_input_bound(&self) -> bool {
        self.dose_mg_per_kg.value() > Self::INPUT_MAX_MG_PER_KG
    }
}
