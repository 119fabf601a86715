//! Trust Engine: one session's synchronous pipeline
//!
//! readings → FusionEngine → RecoveryMonitor picks thresholds →
//! AccessStateMachine → TrustDecision
//!
//! Time is passed in explicitly so the verification loop, the CLI replay and
//! the tests all drive the same code.

use std::collections::BTreeMap;
use std::time::Instant;
use chrono::Utc;

use crate::core::fusion::FusionEngine;
use crate::core::recovery::RecoveryMonitor;
use crate::core::state_machine::{AccessStateMachine, Transition};
use crate::types::{
    AccessState, ReasonCode, SignalReading, TrustConfig, TrustDecision, TrustResult,
    TrustSnapshot,
};

/// Fusion + state machine + recovery for one session
#[derive(Debug, Clone)]
pub struct TrustEngine {
    fusion: FusionEngine,
    machine: AccessStateMachine,
    recovery: RecoveryMonitor,
    tick_count: u64,
    last: Option<TrustDecision>,
}

impl TrustEngine {
    /// Build from config; fails fast on misconfiguration
    pub fn new(config: &TrustConfig, now: Instant) -> TrustResult<Self> {
        let fusion = FusionEngine::new(config)?;
        Ok(Self {
            fusion,
            machine: AccessStateMachine::new(config, now),
            recovery: RecoveryMonitor::new(config),
            tick_count: 0,
            last: None,
        })
    }

    /// Run one tick
    pub fn tick(&mut self, readings: &[SignalReading], now: Instant) -> TrustDecision {
        self.tick_count += 1;
        self.recovery.expire(now);

        let fused = self.fusion.tick(readings);
        let table = *self.recovery.thresholds(now);
        let mut transition = self.machine.evaluate(fused.smoothed, now, &table);

        if self.tick_count == 1 && !transition.changed() {
            transition.reason = ReasonCode::R100_SESSION_START;
        }
        log_transition(&transition, fused.smoothed);

        let decision = TrustDecision {
            timestamp: Utc::now(),
            tick: self.tick_count,
            trust: fused.smoothed,
            raw_trust: fused.raw,
            state: transition.to,
            previous_state: transition.from,
            reason: transition.reason,
            recovery_active: self.recovery.is_active(now),
            contributions: fused.contributions,
        };
        self.last = Some(decision.clone());
        decision
    }

    /// Apply a successful re-authentication: force trust and `Normal`,
    /// open the recovery window
    pub fn reauth_success(&mut self, now: Instant) -> TrustDecision {
        let trust = self.recovery.on_reauth_success(now);
        self.fusion.force_trust(trust);
        let transition = self.machine.force(AccessState::Normal, now);

        tracing::info!(
            from = %transition.from,
            trust,
            "re-authentication succeeded"
        );

        let contributions = self
            .last
            .as_ref()
            .map(|d| d.contributions.clone())
            .unwrap_or_else(BTreeMap::new);

        let decision = TrustDecision {
            timestamp: Utc::now(),
            tick: self.tick_count,
            trust,
            raw_trust: trust,
            state: transition.to,
            previous_state: transition.from,
            reason: transition.reason,
            recovery_active: self.recovery.is_active(now),
            contributions,
        };
        self.last = Some(decision.clone());
        decision
    }

    /// Latest state; trust is `None` until something has been decided
    pub fn current(&self) -> TrustSnapshot {
        match &self.last {
            Some(decision) => decision.snapshot(),
            None => TrustSnapshot::initial(self.machine.state()),
        }
    }

    pub fn state(&self) -> AccessState {
        self.machine.state()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn recovery_active(&self, now: Instant) -> bool {
        self.recovery.is_active(now)
    }
}

fn log_transition(transition: &Transition, trust: f64) {
    if transition.changed() {
        tracing::info!(
            from = %transition.from,
            to = %transition.to,
            trust,
            reason = transition.reason.code(),
            "access state changed"
        );
    } else {
        tracing::debug!(
            state = %transition.to,
            trust,
            reason = transition.reason.code(),
            "access state held"
        );
    }
}
