use std::path::PathBuf;

use thiserror::Error;

/// Errors raised for true precondition violations: bad parameters, missing
/// files, missing optional capabilities. "Snippet not found" is not an error;
/// the inserter and extractor track those as statistics.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("missing capability: {0}")]
    MissingCapability(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse JSON from {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("HTML error: {0}")]
    Html(String),
}

pub type Result<T> = std::result::Result<T, Error>;
