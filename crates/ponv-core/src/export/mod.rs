//! Export of log entries and per-assessment reports.

mod logs;
mod report;

pub use logs::*;
pub use report::*;

use thiserror::Error;

/// Export rendering errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type ExportResult<T> = Result<T, ExportError>;
