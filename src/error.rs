// src/error.rs

use thiserror::Error;

/// Caller bugs detected at the boundary of the selection core.
#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("recency bias must be a finite, non-negative number (got {0})")]
    InvalidRecencyBias(f64),
    #[error("random source must yield a value in [0, 1) (got {0})")]
    RandomOutOfRange(f64),
}

/// Failures of the story archive that backs the candidate list.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("archive I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("archive at '{path}' is not valid JSON: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no story with id '{0}'")]
    NotFound(String),
}

/// Raised when an environment override cannot be parsed.
#[derive(Debug, Error)]
#[error("invalid value for {name}: '{value}'")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Failures of one "play the next story" round trip.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}
