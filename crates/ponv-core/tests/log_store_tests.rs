//! Assessment log integration tests (on-disk database).

use ponv_core::db::{AssessmentLogSink, Database, DbError};
use ponv_core::export::LogExporter;
use ponv_core::models::{
    Age, ClinicalFactor, ClinicalFactors, ModelPrediction, NewLogEntry, PatientAssessment,
    GENESIS_HASH,
};
use ponv_core::pipeline::RiskAssessment;
use ponv_core::scoring::{BasicHybridScorer, FullHybridScorer, HybridScorer};

fn make_entry(age: i64, factors: &[ClinicalFactor], scorer: &dyn HybridScorer) -> NewLogEntry {
    let mut assessment = PatientAssessment::new(Age::new(age).unwrap());
    assessment.factors = factors
        .iter()
        .fold(ClinicalFactors::default(), |acc, f| acc.with(*f, true));
    let result = RiskAssessment::evaluate(&assessment, scorer);
    NewLogEntry::from_assessment(
        &result,
        vec![ModelPrediction::new("logistic_regression", 0.37)],
    )
}

#[test]
fn test_chain_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("ponv_logs.db");
    let full = FullHybridScorer::default();

    let (first, second) = {
        let mut db = Database::open(&path).unwrap();
        let first = db.append(make_entry(30, &[], &full)).unwrap();
        let second = db
            .append(make_entry(
                65,
                &[ClinicalFactor::FemaleGender, ClinicalFactor::HistoryPonv],
                &full,
            ))
            .unwrap();
        (first, second)
    };

    assert_eq!(first.prev_hash, GENESIS_HASH);
    assert_eq!(second.prev_hash, first.entry_hash);

    let mut db = Database::open(&path).unwrap();
    assert_eq!(db.log_entry_count().unwrap(), 2);

    let reloaded = db.log_entry(&second.entry_id).unwrap().unwrap();
    assert_eq!(reloaded, second);
    assert_eq!(reloaded.record.hybrid_score, 3);
    assert!(reloaded.hash_is_valid().unwrap());

    // Appends continue the chain after reopening
    let third = db
        .append(make_entry(50, &[], &BasicHybridScorer))
        .unwrap();
    assert_eq!(third.sequence, 3);
    assert_eq!(third.prev_hash, second.entry_hash);

    let verification = db.verify_log_chain().unwrap();
    assert!(verification.is_intact());
    assert_eq!(verification.entries_checked, 3);
    assert_eq!(verification.head_hash, third.entry_hash);
}

#[test]
fn test_entries_cannot_be_rewritten() {
    let tmp = tempfile::tempdir().unwrap();
    let mut db = Database::open(tmp.path().join("log.db")).unwrap();
    let entry = db
        .append(make_entry(40, &[], &FullHybridScorer::default()))
        .unwrap();

    let update = db.conn().execute(
        "UPDATE assessment_log SET hybrid_score = 99 WHERE entry_id = ?1",
        [&entry.entry_id],
    );
    assert!(update.is_err());

    let delete = db
        .conn()
        .execute("DELETE FROM assessment_log WHERE entry_id = ?1", [&entry.entry_id]);
    assert!(delete.is_err());

    assert_eq!(db.log_entry_count().unwrap(), 1);
    assert!(db.verify_log_chain().unwrap().is_intact());
}

#[test]
fn test_export_lists_newest_first() {
    let tmp = tempfile::tempdir().unwrap();
    let mut db = Database::open(tmp.path().join("log.db")).unwrap();
    let scorer = FullHybridScorer::default();
    let ids: Vec<String> = [25, 45, 75]
        .into_iter()
        .map(|age| db.append(make_entry(age, &[], &scorer)).unwrap().entry_id)
        .collect();

    let export = LogExporter::new(&db).export_all().unwrap();
    assert_eq!(export.metadata.entry_count, 3);
    assert!(export.metadata.chain_intact);
    let exported: Vec<&str> = export.entries.iter().map(|e| e.entry_id.as_str()).collect();
    assert_eq!(exported, vec![ids[2].as_str(), ids[1].as_str(), ids[0].as_str()]);

    let csv = export.to_csv().unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.lines().nth(1).unwrap().contains(&ids[2]));

    let json: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
    assert_eq!(json["entries"].as_array().unwrap().len(), 3);
}

#[test]
fn test_non_finite_probability_never_reaches_the_log() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("log.db");
    let scorer = FullHybridScorer::default();
    let mut db = Database::open(&path).unwrap();
    let kept = db.append(make_entry(55, &[], &scorer)).unwrap();

    for probability in [f64::NAN, f64::INFINITY, -0.5, 1.0001] {
        let mut entry = make_entry(55, &[ClinicalFactor::FemaleGender], &scorer);
        entry.predictions = vec![ModelPrediction::new("gradient_boosting", probability)];
        match db.append(entry) {
            Err(DbError::InvalidPrediction(err)) => assert_eq!(err.model, "gradient_boosting"),
            other => panic!("expected InvalidPrediction, got {:?}", other),
        }
    }
    drop(db);

    // The store stays readable and the chain unbroken
    let mut db = Database::open(&path).unwrap();
    assert_eq!(db.log_entry_count().unwrap(), 1);
    assert_eq!(db.list_log_entries().unwrap()[0].entry_id, kept.entry_id);
    assert!(db.verify_log_chain().unwrap().is_intact());
    assert!(LogExporter::new(&db).export_all().is_ok());

    let next = db.append(make_entry(55, &[], &scorer)).unwrap();
    assert_eq!(next.sequence, 2);
    assert_eq!(next.prev_hash, kept.entry_hash);
}
