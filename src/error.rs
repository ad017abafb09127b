use std::path::PathBuf;

use thiserror::Error;

/// Failures outside the request path: startup, input files, the listener.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    ParseFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid loan in {}: {reason}", .path.display())]
    InvalidLoan { path: PathBuf, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
