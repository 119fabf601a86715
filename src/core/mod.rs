//! Core modules for trustgate

pub mod normalizer;
pub mod decay;
pub mod fusion;
pub mod state_machine;
pub mod recovery;
pub mod engine;
pub mod producer;
pub mod verifier;
pub mod api;

pub use normalizer::ScoreNormalizer;
pub use decay::{DecayPolicy, SourceTrack};
pub use fusion::{FusionEngine, FusionOutput};
pub use state_machine::{AccessStateMachine, Transition};
pub use recovery::{RecoveryMonitor, RecoveryWindow};
pub use engine::TrustEngine;
pub use producer::{SignalProducer, LatestReadings, collect_readings};
pub use verifier::{VerificationLoop, VerificationHandle, ReauthNotifier};
pub use api::{create_router, run_server};
