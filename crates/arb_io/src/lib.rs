//! Scenario loading and CSV export for the arbitration engine. No network
//! I/O, no schema validation layer — scenarios are plain JSON read from a
//! local path and checked by `arb_core`'s own constructors.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for `arb_io` (used by `scenario` and `csv_export`).
#[derive(Debug, Error)]
pub enum IoError {
    #[error("io/path error: {0}")]
    Path(String),

    #[error("json error: {0}")]
    Json(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("scenario rejected by the data model: {0}")]
    Core(#[from] arb_core::errors::CoreError),

    #[error("scenario rejected by the pipeline: {0}")]
    Pipeline(#[from] arb_pipeline::PipelineError),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json(e.to_string())
    }
}

impl From<csv::Error> for IoError {
    fn from(e: csv::Error) -> Self {
        IoError::Csv(e.to_string())
    }
}

pub mod csv_export;
pub mod scenario;

pub use csv_export::write_snapshots_csv;
pub use scenario::{load_scenario_from_path, ConfiguredStrategy, Scenario};
