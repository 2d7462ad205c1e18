//! Itemized score: one named contribution per scored factor.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::models::{ClinicalFactor, Drug};

/// A row of the score breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Factor {
    Clinical(ClinicalFactor),
    Age,
    Drug(Drug),
    Propofol,
    MuscleRelaxant,
}

impl Factor {
    /// Display label shown in the detailed scoring table.
    pub fn label(self) -> String {
        match self {
            Factor::Clinical(factor) => factor.label().to_string(),
            Factor::Age => "Age".to_string(),
            Factor::Drug(drug) => format!("{} Dose", drug.name()),
            Factor::Propofol => "Propofol Use".to_string(),
            Factor::MuscleRelaxant => "Muscle Relaxant Used".to_string(),
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Factor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

/// Points contributed by one factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Contribution {
    pub factor: Factor,
    pub points: i32,
}

/// Ordered contributions whose sum is the hybrid score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    contributions: Vec<Contribution>,
}

impl ScoreBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, factor: Factor, points: i32) {
        self.contributions.push(Contribution { factor, points });
    }

    /// The hybrid score.
    pub fn total(&self) -> i32 {
        self.contributions.iter().map(|c| c.points).sum()
    }

    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }

    /// Points for a factor, if the scorer considered it.
    pub fn get(&self, factor: Factor) -> Option<i32> {
        self.contributions
            .iter()
            .find(|c| c.factor == factor)
            .map(|c| c.points)
    }

    /// `(label, points)` rows in display order.
    pub fn labeled(&self) -> Vec<(String, i32)> {
        self.contributions
            .iter()
            .map(|c| (c.factor.label(), c.points))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }
}
