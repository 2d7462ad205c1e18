//! SQLite schema definition.

/// Stored in `PRAGMA user_version`; bump when the table layout changes.
pub const SCHEMA_VERSION: i64 = 1;

/// Complete database schema for the assessment log.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Assessment Log (Append-Only - Immutable after insert)
-- ============================================================================

CREATE TABLE IF NOT EXISTS assessment_log (
    sequence INTEGER PRIMARY KEY,                -- 1-based chain position
    entry_id TEXT NOT NULL UNIQUE,               -- UUID v4
    created_at TEXT NOT NULL,                    -- RFC 3339
    scoring_variant TEXT NOT NULL CHECK (scoring_variant IN ('full', 'basic')),
    hybrid_score INTEGER NOT NULL,
    risk_category TEXT NOT NULL,
    assessment TEXT NOT NULL,                    -- JSON PatientAssessment
    features TEXT NOT NULL,                      -- JSON array of 23 numbers
    predictions TEXT NOT NULL DEFAULT '[]',      -- JSON array of ModelPrediction
    prev_hash TEXT NOT NULL CHECK (length(prev_hash) = 64),
    entry_hash TEXT NOT NULL UNIQUE CHECK (length(entry_hash) = 64)
);

-- Entries are never rewritten or removed
CREATE TRIGGER IF NOT EXISTS assessment_log_no_update BEFORE UPDATE ON assessment_log
BEGIN
    SELECT RAISE(ABORT, 'assessment_log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS assessment_log_no_delete BEFORE DELETE ON assessment_log
BEGIN
    SELECT RAISE(ABORT, 'assessment_log is append-only');
END;

CREATE INDEX IF NOT EXISTS idx_assessment_log_created ON assessment_log(created_at);
CREATE INDEX IF NOT EXISTS idx_assessment_log_category ON assessment_log(risk_category);
"#;
