//! SQLite storage for the assessment log.

mod logs;
mod schema;

pub use logs::*;
pub use schema::*;

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use thiserror::Error;

/// Writers wait this long for a competing writer before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// A stored row no longer decodes into a log entry
    #[error("Corrupt log row: {0}")]
    Constraint(String),

    /// Rejected before the write; a stored NaN would make the row undecodable
    #[error("Invalid model prediction: {0}")]
    InvalidPrediction(#[from] crate::models::InvalidProbability),

    #[error("Log store schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },
}

pub type DbResult<T> = Result<T, DbError>;

/// Handle on one log store file (or an in-memory store).
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the log store at `path`, creating it and its schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.initialize()?;
        tracing::debug!(path = %path.as_ref().display(), "opened assessment log");
        Ok(db)
    }

    pub fn open_in_memory() -> DbResult<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> DbResult<()> {
        let found: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if found > SCHEMA_VERSION {
            return Err(DbError::UnsupportedSchema {
                found,
                supported: SCHEMA_VERSION,
            });
        }
        self.conn.execute_batch(SCHEMA)?;
        self.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// Raw connection, for read-only inspection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// IMMEDIATE transaction: takes the write lock up front so the chain head
    /// cannot move between reading it and inserting after it.
    pub(crate) fn write_transaction(&mut self) -> DbResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}
