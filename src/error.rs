//! Crate-wide error type.
//!
//! Construction-time failures (malformed configuration, impossible action
//! parameters, unwritable output files) are fatal and propagate to the driver
//! as typed values. Runtime recoveries (e.g. an all-zero transition row) are
//! handled locally and never surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown action `{0}` in config")]
    UnknownAction(String),

    #[error("unknown initializer `{0}` in config")]
    UnknownInitializer(String),

    #[error("unknown observer type `{0}` in config")]
    UnknownObserver(String),

    #[error("unknown flock selection `{0}` in config")]
    UnknownSelection(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("snapshot size mismatch: population holds {expected} agents, snapshot holds {got}")]
    SnapshotMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
