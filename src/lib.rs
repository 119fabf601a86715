//! Trustgate: continuous authentication trust engine
//!
//! Signal readings → ScoreNormalizer → FusionEngine (+ DecayPolicy)
//! → AccessStateMachine (+ RecoveryMonitor) → published TrustDecision

pub mod core;
pub mod types;

// =============================================================================
// FUSION WEIGHTS [C] - sum = 1.0
// =============================================================================

/// Face match weight
pub const WEIGHT_FACE: f64 = 0.5;

/// Liveness weight
pub const WEIGHT_LIVENESS: f64 = 0.2;

/// Behavioral biometrics weight
pub const WEIGHT_BEHAVIOR: f64 = 0.3;

/// Tolerance when checking that weights sum to 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// EMA smoothing factor (weight of the newest raw trust)
pub const SMOOTHING_ALPHA: f64 = 0.3;

// =============================================================================
// DECAY [C]
// =============================================================================

/// Absent ticks until a source decays to the floor (10 ticks @ 2 Hz ≈ 5 s)
pub const DECAY_TICKS_TO_FLOOR: u32 = 10;

/// Decay floor, never exactly 0
pub const DECAY_FLOOR: f64 = 0.1;

/// Contribution of an absent source that has no baseline
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

// =============================================================================
// THRESHOLDS [C] - enter-threshold, trust ≥
// =============================================================================

pub const THRESHOLD_NORMAL: f64 = 0.70;
pub const THRESHOLD_WATCH: f64 = 0.50;
pub const THRESHOLD_RESTRICT: f64 = 0.30;

/// Strict table used while a recovery window is open
pub const STRICT_THRESHOLD_NORMAL: f64 = 0.75;
pub const STRICT_THRESHOLD_WATCH: f64 = 0.55;
pub const STRICT_THRESHOLD_RESTRICT: f64 = 0.35;

/// Extra trust required for an upward transition
pub const HYSTERESIS_MARGIN: f64 = 0.05;

/// Minimum time in a state before an upward transition (milliseconds)
pub const MIN_DWELL_MS: u64 = 2000;

// =============================================================================
// RECOVERY [C]
// =============================================================================

/// Length of the post-re-auth window (milliseconds)
pub const RECOVERY_DURATION_MS: u64 = 60_000;

/// Trust forced on re-auth success
pub const RECOVERY_TRUST: f64 = 0.8;

// =============================================================================
// LOOP [C]
// =============================================================================

/// Verification cadence
pub const TICK_HZ: f64 = 2.0;

/// Capacity of the per-session decision broadcast
pub const DECISION_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
