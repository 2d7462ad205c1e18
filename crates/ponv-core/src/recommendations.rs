//! Clinician guidance per risk category.
//!
//! The text is fixed reference material; selection is a lookup on the
//! category. Rescue therapy is attached to every category.

use serde::Serialize;

use crate::risk::RiskCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GuidanceSection {
    pub heading: &'static str,
    pub items: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GuidanceBundle {
    pub title: &'static str,
    pub rationale: &'static str,
    pub source: &'static str,
    pub sections: &'static [GuidanceSection],
}

impl GuidanceBundle {
    /// Every item, section by section.
    pub fn items(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter().copied())
    }
}

/// Prophylaxis for a category plus the rescue bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Guidance {
    pub category: RiskCategory,
    pub prophylaxis: &'static GuidanceBundle,
    pub rescue: &'static GuidanceBundle,
}

pub const LOW_RISK_GUIDANCE: GuidanceBundle = GuidanceBundle {
    title: "Low Risk Recommendations",
    rationale: "Routine pharmacological prophylaxis may not be required",
    source: "ASHP Guidelines",
    sections: &[
        GuidanceSection {
            heading: "Prophylaxis",
            items: &["Routine pharmacological prophylaxis may not be required"],
        },
        GuidanceSection {
            heading: "Minimize emetogenic stimuli",
            items: &[
                "Avoid volatile anesthetics and nitrous oxide when possible",
                "Consider regional anesthesia techniques",
                "Optimize hydration and reduce opioid use",
            ],
        },
    ],
};

pub const MODERATE_RISK_GUIDANCE: GuidanceBundle = GuidanceBundle {
    title: "Moderate Risk Recommendations",
    rationale: "Dual prophylaxis is recommended",
    source: "Fourth Consensus Guidelines for the Management of PONV (2020), ASHP",
    sections: &[
        GuidanceSection {
            heading: "Pharmacological prophylaxis",
            items: &[
                "Ondansetron 4-8 mg IV at end of surgery",
                "Dexamethasone 4 mg IV at induction",
                "Midazolam 1-2 mg IV if anxiety is present",
            ],
        },
        GuidanceSection {
            heading: "Anesthetic techniques",
            items: &[
                "Use TIVA with propofol",
                "Minimize opioids with multimodal analgesia",
                "Avoid nitrous oxide",
            ],
        },
        GuidanceSection {
            heading: "Supportive measures",
            items: &[
                "Ensure adequate hydration",
                "Gastric decompression",
                "Observe for more than 30 min in PACU",
            ],
        },
    ],
};

pub const HIGH_RISK_GUIDANCE: GuidanceBundle = GuidanceBundle {
    title: "High / Very High Risk Recommendations",
    rationale: "Multimodal prevention is mandatory",
    source: "2020 SAMBA & ASHP Consensus Guidelines; FDA draft guidance (2024)",
    sections: &[
        GuidanceSection {
            heading: "Triple therapy",
            items: &[
                "Ondansetron 4-8 mg IV",
                "Dexamethasone 4-8 mg IV",
                "NK1 antagonist: aprepitant 40 mg PO or fosaprepitant 150 mg IV",
            ],
        },
        GuidanceSection {
            heading: "Additional agents",
            items: &[
                "Scopolamine patch 1.5 mg transdermal",
                "Droperidol 0.625-1.25 mg IV if no QT prolongation",
            ],
        },
        GuidanceSection {
            heading: "Anesthetic techniques",
            items: &[
                "Propofol TIVA is mandatory",
                "Opioid-sparing analgesia (nerve blocks, ketamine or dexmedetomidine)",
                "Avoid volatile anesthetics and nitrous oxide",
            ],
        },
        GuidanceSection {
            heading: "Postoperative care",
            items: &[
                "PACU observation for at least 2 h",
                "Keep rescue medications immediately available",
                "Discharge with an antiemetic prescription (ondansetron or promethazine)",
            ],
        },
    ],
};

pub const RESCUE_GUIDANCE: GuidanceBundle = GuidanceBundle {
    title: "Rescue Therapy",
    rationale: "Treat established PONV with a class not used for prophylaxis",
    source: "OpenAnesthesia: PONV management",
    sections: &[
        GuidanceSection {
            heading: "First-line",
            items: &[
                "Metoclopramide 10 mg IV",
                "Promethazine 12.5-25 mg IV",
            ],
        },
        GuidanceSection {
            heading: "Second-line",
            items: &[
                "Scopolamine patch if not previously used",
                "Haloperidol 0.5-1 mg IV if QTc is normal",
            ],
        },
        GuidanceSection {
            heading: "Rule",
            items: &["Do not repeat the drug class used for prophylaxis"],
        },
    ],
};

/// Prophylaxis bundle for a category.
pub fn prophylaxis(category: RiskCategory) -> &'static GuidanceBundle {
    match category {
        RiskCategory::VeryLow | RiskCategory::Low => &LOW_RISK_GUIDANCE,
        RiskCategory::Moderate => &MODERATE_RISK_GUIDANCE,
        RiskCategory::High | RiskCategory::VeryHigh => &HIGH_RISK_GUIDANCE,
    }
}

pub fn guidance(category: RiskCategory) -> Guidance {
    Guidance {
        category,
        prophylaxis: prophylaxis(category),
        rescue: &RESCUE_GUIDANCE,
    }
}

/// Ordered guidance strings: prophylaxis items, then rescue items.
pub fn recommendations(category: RiskCategory) -> Vec<String> {
    let guidance = guidance(category);
    guidance
        .prophylaxis
        .items()
        .chain(guidance.rescue.items())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_rescue_appended() {
        let rescue: Vec<&str> = RESCUE_GUIDANCE.items().collect();
        for category in RiskCategory::ALL {
            let items = recommendations(category);
            assert!(items.len() > rescue.len());
            let tail: Vec<&str> = items[items.len() - rescue.len()..]
                .iter()
                .map(String::as_str)
                .collect();
            assert_eq!(tail, rescue, "{category}");
        }
    }

    #[test]
    fn test_grouped_categories_share_bundles() {
        assert_eq!(
            recommendations(RiskCategory::VeryLow),
            recommendations(RiskCategory::Low)
        );
        assert_eq!(
            recommendations(RiskCategory::High),
            recommendations(RiskCategory::VeryHigh)
        );
        assert_ne!(
            recommendations(RiskCategory::Moderate),
            recommendations(RiskCategory::High)
        );
    }

    #[test]
    fn test_moderate_starts_with_ondansetron() {
        let items = recommendations(RiskCategory::Moderate);
        assert_eq!(items[0], "Ondansetron 4-8 mg IV at end of surgery");
    }
}
