//! Dose-response step functions.
//!
//! Each drug's contribution is an ordered list of tiers. A tier covers doses up
//! to `upper`, either inclusively (`dose <= upper`) or exclusively
//! (`dose < upper`); the first tier that covers the dose supplies the points.
//! Doses past the last tier score `maximal`, so no input bound is assumed.

use crate::models::{Dose, Drug, MuscleRelaxant, MuscleRelaxantAgent, PropofolMode};

/// One step of a dose-response function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub upper: f64,
    pub inclusive: bool,
    pub points: i32,
}

impl Tier {
    /// Covers doses `<= upper`.
    pub const fn up_to(upper: f64, points: i32) -> Self {
        Self {
            upper,
            inclusive: true,
            points,
        }
    }

    /// Covers doses `< upper`.
    pub const fn below(upper: f64, points: i32) -> Self {
        Self {
            upper,
            inclusive: false,
            points,
        }
    }

    pub fn covers(&self, value: f64) -> bool {
        if self.inclusive {
            value <= self.upper
        } else {
            value < self.upper
        }
    }
}

fn step_points(tiers: &[Tier], maximal: i32, value: f64) -> i32 {
    tiers
        .iter()
        .find(|tier| tier.covers(value))
        .map_or(maximal, |tier| tier.points)
}

/// A drug's step function. A dose of exactly zero always scores 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoseResponse {
    pub drug: Drug,
    pub tiers: &'static [Tier],
    pub maximal: i32,
}

impl DoseResponse {
    pub fn score(&self, dose: Dose) -> i32 {
        if dose.is_zero() {
            return 0;
        }
        step_points(self.tiers, self.maximal, dose.value())
    }
}

pub const MIDAZOLAM: DoseResponse = DoseResponse {
    drug: Drug::Midazolam,
    tiers: &[Tier::up_to(2.0, -1), Tier::up_to(10.0, -2)],
    maximal: -3,
};

pub const ONDANSETRON: DoseResponse = DoseResponse {
    drug: Drug::Ondansetron,
    tiers: &[Tier::below(4.0, -1), Tier::below(8.0, -2)],
    maximal: -3,
};

pub const DEXAMETHASONE: DoseResponse = DoseResponse {
    drug: Drug::Dexamethasone,
    tiers: &[Tier::below(4.0, -1), Tier::up_to(10.0, -2)],
    maximal: -3,
};

pub const GLYCOPYRROLATE: DoseResponse = DoseResponse {
    drug: Drug::Glycopyrrolate,
    tiers: &[Tier::up_to(0.2, 1)],
    maximal: 2,
};

pub const NALBUPHINE: DoseResponse = DoseResponse {
    drug: Drug::Nalbuphine,
    tiers: &[Tier::up_to(10.0, 1)],
    maximal: 2,
};

/// Fentanyl tiers are in mcg.
pub const FENTANYL: DoseResponse = DoseResponse {
    drug: Drug::Fentanyl,
    tiers: &[Tier::up_to(100.0, 1), Tier::up_to(500.0, 2)],
    maximal: 3,
};

pub const BUTORPHANOL: DoseResponse = DoseResponse {
    drug: Drug::Butorphanol,
    tiers: &[Tier::up_to(2.0, 1)],
    maximal: 2,
};

pub const PENTAZOCINE: DoseResponse = DoseResponse {
    drug: Drug::Pentazocine,
    tiers: &[Tier::up_to(100.0, 1), Tier::up_to(200.0, 2)],
    maximal: 3,
};

/// The step function for a drug.
pub fn dose_response(drug: Drug) -> &'static DoseResponse {
    match drug {
        Drug::Midazolam => &MIDAZOLAM,
        Drug::Ondansetron => &ONDANSETRON,
        Drug::Dexamethasone => &DEXAMETHASONE,
        Drug::Glycopyrrolate => &GLYCOPYRROLATE,
        Drug::Nalbuphine => &NALBUPHINE,
        Drug::Fentanyl => &FENTANYL,
        Drug::Butorphanol => &BUTORPHANOL,
        Drug::Pentazocine => &PENTAZOCINE,
    }
}

pub fn drug_score(drug: Drug, dose: Dose) -> i32 {
    dose_response(drug).score(dose)
}

pub fn midazolam_score(dose: Dose) -> i32 {
    MIDAZOLAM.score(dose)
}

pub fn ondansetron_score(dose: Dose) -> i32 {
    ONDANSETRON.score(dose)
}

pub fn dexamethasone_score(dose: Dose) -> i32 {
    DEXAMETHASONE.score(dose)
}

pub fn glycopyrrolate_score(dose: Dose) -> i32 {
    GLYCOPYRROLATE.score(dose)
}

pub fn nalbuphine_score(dose: Dose) -> i32 {
    NALBUPHINE.score(dose)
}

pub fn fentanyl_score(dose_mcg: Dose) -> i32 {
    FENTANYL.score(dose_mcg)
}

pub fn butorphanol_score(dose: Dose) -> i32 {
    BUTORPHANOL.score(dose)
}

pub fn pentazocine_score(dose: Dose) -> i32 {
    PENTAZOCINE.score(dose)
}

/// Propofol technique. Propofol dose fields never reach this function.
pub fn propofol_score(mode: PropofolMode) -> i32 {
    match mode {
        PropofolMode::Tiva => -3,
        PropofolMode::InductionOnly => -1,
        PropofolMode::None => 0,
    }
}

/// Muscle relaxant contribution (mg/kg tiers per agent).
///
/// Unlike the drug tables there is no zero-dose rule: choosing succinylcholine
/// or a benzylisoquinolinium scores at least one point.
pub fn muscle_relaxant_score(relaxant: &MuscleRelaxant) -> i32 {
    let dose = relaxant.dose_mg_per_kg.value();
    match relaxant.agent {
        MuscleRelaxantAgent::None => 0,
        MuscleRelaxantAgent::Succinylcholine => step_points(&[Tier::below(1.5, 1)], 2, dose),
        MuscleRelaxantAgent::Rocuronium => {
            step_points(&[Tier::below(0.6, 0), Tier::up_to(1.0, 1)], 2, dose)
        }
        MuscleRelaxantAgent::Vecuronium => step_points(&[Tier::below(0.1, 0)], 1, dose),
        MuscleRelaxantAgent::Atracurium | MuscleRelaxantAgent::Cisatracurium => {
            step_points(&[Tier::below(0.4, 1)], 2, dose)
        }
    }
}
