//! Core types for trustgate

mod state;
mod signals;
mod output;
mod reason;
mod error;
mod config;

pub use state::AccessState;
pub use signals::{SignalSource, SignalReading};
pub use output::{TrustDecision, TrustSnapshot};
pub use reason::ReasonCode;
pub use error::{TrustError, TrustResult};
pub use config::{
    TrustConfig, SourceConfig, ScoreMapping, ThresholdTable, DecayConfig, RecoveryConfig,
};
