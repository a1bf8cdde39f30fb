use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by quake-report.
///
/// Per-line data problems are never errors: they surface as
/// [`Diagnostic`](crate::models::Diagnostic)s. Only a source that cannot be
/// read at all fails an ingestion call.
#[derive(Error, Debug)]
pub enum QuakeError {
    /// The input file could not be opened.
    #[error("Source unavailable {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading failed part-way through the input.
    #[error("Failed to read source at line {line}: {source}")]
    SourceRead {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    /// A record was constructed with values that break its invariants.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// No CSV files were found under the given directory.
    #[error("No CSV files found in {0}")]
    NoSourceFiles(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be produced or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuakeError {
    /// `true` for the errors that mean the input could not be obtained.
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            QuakeError::SourceUnavailable { .. }
                | QuakeError::SourceRead { .. }
                | QuakeError::NoSourceFiles(_)
        )
    }
}

/// Convenience alias used throughout the quake crates.
pub type Result<T> = std::result::Result<T, QuakeError>;
