//! Golden scoring scenarios.
//!
//! Each case goes through the form input path (JSON -> AssessmentInput ->
//! PatientAssessment) and the full scorer, then checks score and category.

use ponv_core::models::{AssessmentInput, Dose, PatientAssessment};
use ponv_core::pipeline::RiskAssessment;
use ponv_core::risk::{risk_category, RiskCategory};
use ponv_core::scoring::{
    calculate_hybrid_score, fentanyl_score, score_breakdown, FullHybridScorer,
};
use serde_json::{json, Value};

/// A form with every answer "No", age 40, no drugs.
fn baseline() -> Value {
    json!({
        "female_gender": "No",
        "non_smoker": "No",
        "history_ponv": "No",
        "age": 40,
        "preop_anxiety": "No",
        "history_migraine": "No",
        "obesity": "No",
        "abdominal_surgery": "No",
        "ent_surgery": "No",
        "gynae_surgery": "No",
        "surgery_over_60_min": "No",
        "major_blood_loss": "No",
        "volatile_agents": "No",
        "nitrous_oxide": "No",
        "midazolam_mg": 0.0,
        "ondansetron_mg": 0.0,
        "dexamethasone_mg": 0.0,
        "glycopyrrolate_mg": 0.0,
        "nalbuphine_mg": 0.0,
        "fentanyl_mcg": 0.0,
        "butorphanol_mg": 0.0,
        "pentazocine_mg": 0.0,
        "propofol_mode": "None",
        "muscle_relaxant": "None"
    })
}

const BINARY_FIELDS: [&str; 13] = [
    "female_gender",
    "non_smoker",
    "history_ponv",
    "preop_anxiety",
    "history_migraine",
    "obesity",
    "abdominal_surgery",
    "ent_surgery",
    "gynae_surgery",
    "surgery_over_60_min",
    "major_blood_loss",
    "volatile_agents",
    "nitrous_oxide",
];

fn assessment(form: Value) -> PatientAssessment {
    let input: AssessmentInput = serde_json::from_value(form).unwrap();
    PatientAssessment::try_from(input).unwrap()
}

struct GoldenCase {
    id: &'static str,
    form: Value,
    expected_score: i32,
    expected_category: RiskCategory,
}

fn golden_cases() -> Vec<GoldenCase> {
    let mut cases = Vec::new();

    cases.push(GoldenCase {
        id: "all-no-no-drugs",
        form: baseline(),
        expected_score: 0,
        expected_category: RiskCategory::Low,
    });

    let mut form = baseline();
    form["female_gender"] = json!("Yes");
    form["non_smoker"] = json!("Yes");
    form["history_ponv"] = json!("Yes");
    form["age"] = json!(60);
    cases.push(GoldenCase {
        id: "three-factors-over-50",
        form,
        expected_score: 4,
        expected_category: RiskCategory::Moderate,
    });

    let mut form = baseline();
    for field in BINARY_FIELDS {
        form[field] = json!("Yes");
    }
    form["age"] = json!(60);
    form["ondansetron_mg"] = json!(8.0);
    form["dexamethasone_mg"] = json!(10.0);
    form["propofol_mode"] = json!("TIVA");
    // 13 + 1 - 3 (ondansetron at 8) - 2 (dexamethasone at 10) - 3 (TIVA)
    cases.push(GoldenCase {
        id: "all-yes-with-prophylaxis",
        form,
        expected_score: 6,
        expected_category: RiskCategory::Moderate,
    });

    let mut form = baseline();
    form["propofol_mode"] = json!("TIVA");
    form["propofol_tiva_mg_per_hr"] = json!(200.0);
    form["propofol_induction_mg_per_kg"] = json!(2.0);
    form["midazolam_mg"] = json!(12.0);
    cases.push(GoldenCase {
        id: "deep-protective",
        form,
        expected_score: -6,
        expected_category: RiskCategory::VeryLow,
    });

    let mut form = baseline();
    for field in BINARY_FIELDS {
        form[field] = json!("Yes");
    }
    form["age"] = json!(70);
    form["fentanyl_mcg"] = json!(150.0);
    cases.push(GoldenCase {
        id: "all-yes-with-opioid",
        form,
        expected_score: 16,
        expected_category: RiskCategory::VeryHigh,
    });

    cases
}

#[test]
fn test_golden_scenarios() {
    let scorer = FullHybridScorer::default();
    for case in golden_cases() {
        let a = assessment(case.form);
        let result = RiskAssessment::evaluate(&a, &scorer);
        assert_eq!(
            result.hybrid_score, case.expected_score,
            "case {}: score",
            case.id
        );
        assert_eq!(
            result.category, case.expected_category,
            "case {}: category",
            case.id
        );
        assert_eq!(
            calculate_hybrid_score(&a),
            case.expected_score,
            "case {}: free function",
            case.id
        );
        assert_eq!(score_breakdown(&a).total(), case.expected_score, "case {}", case.id);
    }
}

#[test]
fn test_fentanyl_boundaries() {
    assert_eq!(fentanyl_score(Dose::new(600.0).unwrap()), 3);
    assert_eq!(fentanyl_score(Dose::new(100.0).unwrap()), 1);
    assert_eq!(fentanyl_score(Dose::new(101.0).unwrap()), 2);
}

#[test]
fn test_propofol_doses_are_not_scored() {
    let mut with_doses = baseline();
    with_doses["propofol_mode"] = json!("TIVA");
    with_doses["propofol_tiva_mg_per_hr"] = json!(250.0);
    with_doses["propofol_induction_mg_per_kg"] = json!(2.5);

    let mut without_doses = baseline();
    without_doses["propofol_mode"] = json!("TIVA");

    let a = calculate_hybrid_score(&assessment(with_doses));
    let b = calculate_hybrid_score(&assessment(without_doses));
    assert_eq!(a, -3);
    assert_eq!(a, b);
}

#[test]
fn test_category_extremes() {
    assert_eq!(risk_category(-6), ("Very Low Risk", "very-low-risk"));
    assert_eq!(risk_category(16), ("Very High Risk", "very-high-risk"));
}

#[test]
fn test_muscle_relaxant_counts_in_full_variant() {
    let mut form = baseline();
    form["muscle_relaxant"] = json!("Rocuronium");
    form["muscle_relaxant_mg_per_kg"] = json!(1.2);
    assert_eq!(calculate_hybrid_score(&assessment(form)), 2);
}

#[test]
fn test_missing_form_fields_are_all_reported() {
    let mut form = baseline();
    let map = form.as_object_mut().unwrap();
    map.remove("age");
    map.remove("fentanyl_mcg");
    map.remove("propofol_mode");

    let input: AssessmentInput = serde_json::from_value(form).unwrap();
    let err = PatientAssessment::try_from(input).unwrap_err();
    let message = err.to_string();
    for field in ["age", "fentanyl_mcg", "propofol_mode"] {
        assert!(message.contains(field), "{message} should list {field}");
    }
}
