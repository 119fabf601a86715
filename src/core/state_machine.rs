//! Access State Machine: hysteresis + minimum dwell time
//!
//! State transitions:
//! - Any state → lower state: trust < enter-threshold (immediate, may skip hops)
//! - Any state → next higher state: trust ≥ threshold + margin AND dwell ≥ min_dwell
//! - REAUTH → RESTRICT: only when not latched; otherwise re-auth success only
//!
//! Upward moves are one hop per evaluation.

use std::time::{Duration, Instant};
use crate::types::{AccessState, ReasonCode, ThresholdTable, TrustConfig};

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: AccessState,
    pub to: AccessState,
    pub reason: ReasonCode,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Access state machine for one session
#[derive(Debug, Clone)]
pub struct AccessStateMachine {
    /// Current state
    current: AccessState,
    /// When current state began
    entered_at: Instant,
    /// Extra trust needed to move up
    margin: f64,
    /// Minimum time in a state before moving up
    min_dwell: Duration,
    /// REAUTH only left via re-auth success
    reauth_latched: bool,
    /// Number of transitions
    transition_count: u64,
}

impl AccessStateMachine {
    /// Create machine in the configured initial state, entered at `now`
    pub fn new(config: &TrustConfig, now: Instant) -> Self {
        Self {
            current: config.initial_state,
            entered_at: now,
            margin: config.hysteresis_margin,
            min_dwell: config.min_dwell(),
            reauth_latched: config.reauth_latched,
            transition_count: 0,
        }
    }

    /// Evaluate `trust` at `now` against `table` and apply any transition
    pub fn evaluate(&mut self, trust: f64, now: Instant, table: &ThresholdTable) -> Transition {
        let from = self.current;
        let (to, reason) = self.compute_transition(trust, now, table);

        if to != from {
            self.current = to;
            self.entered_at = now;
            self.transition_count += 1;
        }

        Transition { from, to, reason }
    }

    /// Compute next state without mutating
    fn compute_transition(
        &self,
        trust: f64,
        now: Instant,
        table: &ThresholdTable,
    ) -> (AccessState, ReasonCode) {
        let candidate = table.candidate(trust);

        // Degradation is immediate
        if candidate < self.current {
            return if candidate == AccessState::Reauth {
                (AccessState::Reauth, ReasonCode::R201_ENTERED_REAUTH)
            } else {
                (candidate, ReasonCode::R200_DEGRADED)
            };
        }

        if candidate == self.current {
            return (self.current, self.held_reason());
        }

        if self.current == AccessState::Reauth && self.reauth_latched {
            return (AccessState::Reauth, ReasonCode::R202_REAUTH_LATCHED);
        }

        // Upgrade: one hop, margin, then dwell
        let Some(next) = self.current.higher() else {
            return (self.current, ReasonCode::R101_STATE_HELD);
        };

        if trust < table.enter_threshold(next) + self.margin {
            return (self.current, ReasonCode::R301_UPGRADE_HELD_HYSTERESIS);
        }

        if self.dwell(now) < self.min_dwell {
            return (self.current, ReasonCode::R302_UPGRADE_HELD_DWELL);
        }

        (next, ReasonCode::R300_UPGRADED)
    }

    fn held_reason(&self) -> ReasonCode {
        if self.current == AccessState::Reauth {
            ReasonCode::R202_REAUTH_LATCHED
        } else {
            ReasonCode::R101_STATE_HELD
        }
    }

    /// Set state directly, bypassing transition rules (re-auth override)
    pub fn force(&mut self, state: AccessState, now: Instant) -> Transition {
        let from = self.current;
        self.current = state;
        self.entered_at = now;
        self.transition_count += 1;
        Transition {
            from,
            to: state,
            reason: ReasonCode::R400_REAUTH_OVERRIDE,
        }
    }

    /// Get current state
    pub fn state(&self) -> AccessState {
        self.current
    }

    /// When the current state was entered
    pub fn entered_at(&self) -> Instant {
        self.entered_at
    }

    /// Time spent in the current state
    pub fn dwell(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.entered_at)
    }

    /// Get transition count
    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }
}

// =============================================================================
// TESTS
// =============================================================================
