//! Error types
//!
//! Only construction and I/O can fail. A tick always yields a decision.

use std::path::PathBuf;
use thiserror::Error;

/// Root error type for trustgate
#[derive(Error, Debug)]
pub enum TrustError {
    /// Invalid configuration (weights, thresholds, durations)
    #[error("config error: {0}")]
    Config(String),

    /// Config file could not be read
    #[error("failed to read config at {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    /// The verification loop for this session has stopped
    #[error("verification session is closed")]
    SessionClosed,
}

pub type TrustResult<T> = Result<T, TrustError>;
