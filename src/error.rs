//! Error types shared by every pipeline stage.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PvError>;

#[derive(Debug, Error)]
pub enum PvError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("solar position error: {0}")]
    SolarPosition(#[from] solar_positioning::Error),

    /// A required column is absent from the weather file header
    #[error("weather file is missing required column '{0}'")]
    MissingColumn(String),

    /// Row count does not cover exactly one calendar year of hours
    #[error("weather file has {found} rows, expected 8760 or 8784")]
    RowCount { found: usize },

    /// Consecutive timestamps are not exactly one hour apart
    #[error("weather timestamps not hourly at row {row}: {previous} -> {current}")]
    TimestampGap { row: usize, previous: String, current: String },

    #[error("cannot parse {field} '{value}' on row {row}")]
    Parse { row: usize, field: String, value: String },

    #[error("local time {0} does not exist in the site time zone")]
    NonexistentLocalTime(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("METPV input error: {0}")]
    Metpv(String),
}
