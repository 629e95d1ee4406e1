use thiserror::Error;

/// Failures at the edges of the pipeline: reading input files, reading the
/// config and writing reports. Row normalization itself never fails.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file format: '{0}' (expected .xlsx, .xls, .xlsm, .ods, .csv or .json)")]
    UnsupportedFormat(String),

    #[error("spreadsheet parse failed: {0}")]
    Spreadsheet(String),

    #[error("input has no header row")]
    MissingHeader,

    #[error("invalid config {path}: {message}")]
    Config { path: String, message: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;
