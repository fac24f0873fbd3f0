//! Error - Failure kinds for race operations and storage

use std::path::PathBuf;

/// Failure reading or writing the race collection
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access race store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("race store {path} holds malformed data: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode races: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("race store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the registry and the simulation engine
#[derive(Debug, thiserror::Error)]
pub enum RaceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("race {0} not found")]
    NotFound(u32),

    #[error("race is malformed: {0}")]
    InvalidState(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl RaceError {
    /// Stable machine-readable kind for callers
    pub fn kind(&self) -> &'static str {
        match self {
            RaceError::InvalidArgument(_) => "invalid_argument",
            RaceError::NotFound(_) => "not_found",
            RaceError::InvalidState(_) => "invalid_state",
            RaceError::Storage(_) => "storage_error",
        }
    }
}

pub type RaceResult<T> = Result<T, RaceError>;
