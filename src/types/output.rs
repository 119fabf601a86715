//! Published decisions

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use crate::types::{AccessState, ReasonCode, SignalSource};

/// One decision, pushed to subscribers once per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustDecision {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Tick number within the session (0 for events before the first tick)
    pub tick: u64,
    /// Smoothed trust value
    pub trust: f64,
    /// Unsmoothed weighted sum for this tick
    pub raw_trust: f64,
    /// Current access state
    pub state: AccessState,
    /// State before this decision
    pub previous_state: AccessState,
    /// Reason for current state
    pub reason: ReasonCode,
    /// Strict thresholds in force?
    pub recovery_active: bool,
    /// Per-source values used for fusion (after normalization or decay)
    pub contributions: BTreeMap<SignalSource, f64>,
}

impl TrustDecision {
    /// Did the state change?
    pub fn changed(&self) -> bool {
        self.state != self.previous_state
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let color = self.state.color_code();
        let reset = AccessState::color_reset();
        let emoji = self.state.emoji();
        let recovery = if self.recovery_active { " | recovery" } else { "" };

        format!(
            "{}{} #{} trust={:.3} raw={:.3} | state={}{} | {}{}",
            color,
            emoji,
            self.tick,
            self.trust,
            self.raw_trust,
            self.state,
            recovery,
            self.reason.code(),
            reset
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "tick={} | trust={:.3} | raw={:.3} | state={} | recovery={} | reason={}",
            self.tick,
            self.trust,
            self.raw_trust,
            self.state,
            self.recovery_active,
            self.reason.code()
        )
    }

    pub fn snapshot(&self) -> TrustSnapshot {
        TrustSnapshot {
            trust: Some(self.trust),
            state: self.state,
            timestamp: self.timestamp,
        }
    }
}

/// Synchronous view of the latest state.
///
/// `trust` is `None` until the first tick has run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustSnapshot {
    pub trust: Option<f64>,
    pub state: AccessState,
    pub timestamp: DateTime<Utc>,
}

impl TrustSnapshot {
    /// Snapshot before any tick
    pub fn initial(state: AccessState) -> Self {
        Self {
            trust: None,
            state,
            timestamp: Utc::now(),
        }
    }
}
