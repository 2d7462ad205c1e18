//! Risk categorization of the hybrid score.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown risk category '{0}'")]
pub struct UnknownCategory(pub String);

/// Ordered risk bands. The score ranges partition every integer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RiskCategory {
    #[serde(rename = "Very Low Risk")]
    VeryLow,
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Very High Risk")]
    VeryHigh,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 5] = [
        RiskCategory::VeryLow,
        RiskCategory::Low,
        RiskCategory::Moderate,
        RiskCategory::High,
        RiskCategory::VeryHigh,
    ];

    pub fn from_score(score: i32) -> Self {
        match score {
            i32::MIN..=-5 => RiskCategory::VeryLow,
            -4..=3 => RiskCategory::Low,
            4..=9 => RiskCategory::Moderate,
            10..=15 => RiskCategory::High,
            16..=i32::MAX => RiskCategory::VeryHigh,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::VeryLow => "Very Low Risk",
            RiskCategory::Low => "Low Risk",
            RiskCategory::Moderate => "Moderate Risk",
            RiskCategory::High => "High Risk",
            RiskCategory::VeryHigh => "Very High Risk",
        }
    }

    /// Style tag used by report renderers.
    pub fn css_tag(self) -> &'static str {
        match self {
            RiskCategory::VeryLow => "very-low-risk",
            RiskCategory::Low => "low-risk",
            RiskCategory::Moderate => "moderate-risk",
            RiskCategory::High => "high-risk",
            RiskCategory::VeryHigh => "very-high-risk",
        }
    }

    /// Display-only gauge value. Not used by any decision.
    pub fn risk_percentage(self) -> u8 {
        match self {
            RiskCategory::VeryLow => 5,
            RiskCategory::Low => 25,
            RiskCategory::Moderate => 50,
            RiskCategory::High => 75,
            RiskCategory::VeryHigh => 95,
        }
    }

    /// Inclusive score bounds; `None` marks an open end.
    pub fn score_range(self) -> (Option<i32>, Option<i32>) {
        match self {
            RiskCategory::VeryLow => (None, Some(-5)),
            RiskCategory::Low => (Some(-4), Some(3)),
            RiskCategory::Moderate => (Some(4), Some(9)),
            RiskCategory::High => (Some(10), Some(15)),
            RiskCategory::VeryHigh => (Some(16), None),
        }
    }

    pub fn contains(self, score: i32) -> bool {
        let (low, high) = self.score_range();
        low.map_or(true, |l| score >= l) && high.map_or(true, |h| score <= h)
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RiskCategory {
    type Err = UnknownCategory;

    /// Accepts the full label ("High Risk"), the short form ("High") or the tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        RiskCategory::ALL
            .into_iter()
            .find(|category| {
                let label = category.label();
                label.eq_ignore_ascii_case(needle)
                    || label
                        .strip_suffix(" Risk")
                        .is_some_and(|short| short.eq_ignore_ascii_case(needle))
                    || category.css_tag().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// `(label, css_tag)` for a score.
pub fn risk_category(score: i32) -> (&'static str, &'static str) {
    let category = RiskCategory::from_score(score);
    (category.label(), category.css_tag())
}
