//! Integration tests for the trust pipeline
//!
//! Drives TrustEngine on a hand-advanced clock: fusion, decay, hysteresis,
//! dwell time, re-auth override and recovery expiry.

use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};
use trustgate::core::TrustEngine;
use trustgate::types::{
    AccessState, ReasonCode, SignalReading, SignalSource, SourceConfig, TrustConfig,
    TrustDecision, TrustError,
};

const TICK: Duration = Duration::from_millis(500);

fn readings(face: Option<f64>, liveness: Option<f64>, behavior: Option<f64>) -> Vec<SignalReading> {
    vec![
        SignalReading { source: SignalSource::Face, value: face },
        SignalReading { source: SignalSource::Liveness, value: liveness },
        SignalReading { source: SignalSource::Behavior, value: behavior },
    ]
}

fn uniform(value: f64) -> Vec<SignalReading> {
    readings(Some(value), Some(value), Some(value))
}

/// Unsmoothed config so trust == raw weighted sum
fn raw_config() -> TrustConfig {
    TrustConfig {
        smoothing_alpha: 1.0,
        ..TrustConfig::default()
    }
}

/// Engine plus its virtual clock
struct Harness {
    engine: TrustEngine,
    now: Instant,
}

impl Harness {
    fn new(config: &TrustConfig) -> Self {
        let now = Instant::now();
        Self {
            engine: TrustEngine::new(config, now).unwrap(),
            now,
        }
    }

    fn tick(&mut self, readings: &[SignalReading]) -> TrustDecision {
        let decision = self.engine.tick(readings, self.now);
        self.now += TICK;
        decision
    }

    fn reauth(&mut self) -> TrustDecision {
        self.engine.reauth_success(self.now)
    }

    fn wait(&mut self, duration: Duration) {
        self.now += duration;
    }
}

#[test]
fn test_face_occlusion_scenario() {
    let mut h = Harness::new(&TrustConfig::default());

    // Starting point: 0.5*0.8 + 0.2*0.7 + 0.3*0.8 = 0.78
    let start = h.tick(&readings(Some(0.8), Some(0.7), Some(0.8)));
    assert!((start.trust - 0.78).abs() < 1e-9);
    assert_eq!(start.state, AccessState::Normal);

    // Face covered for 10 ticks
    let mut trail = Vec::new();
    for _ in 0..10 {
        trail.push(h.tick(&readings(None, Some(0.7), Some(0.8))));
    }

    // Trust descends every tick and never jumps
    for pair in trail.windows(2) {
        assert!(pair[1].trust < pair[0].trust);
        assert!(pair[0].trust - pair[1].trust < 0.05);
    }
    // Face contribution reaches the floor by the last absent tick
    assert_eq!(trail[9].contributions[&SignalSource::Face], 0.1);

    let first_watch = trail.iter().position(|d| d.state == AccessState::Watch).unwrap();
    let first_restrict = trail.iter().position(|d| d.state == AccessState::Restrict).unwrap();
    assert!(first_watch < first_restrict);
    assert_eq!(trail[first_watch].reason, ReasonCode::R200_DEGRADED);
    assert_eq!(trail[9].state, AccessState::Restrict);

    // Uncovering restores the face contribution in one tick
    let back = h.tick(&readings(Some(0.8), Some(0.7), Some(0.8)));
    assert!((back.raw_trust - 0.78).abs() < 1e-9);
    assert_eq!(back.contributions[&SignalSource::Face], 0.8);
    assert!(back.trust > trail[9].trust);
    // The state climbs back only after dwell time
    assert_eq!(back.state, AccessState::Restrict);
    assert_eq!(back.reason, ReasonCode::R302_UPGRADE_HELD_DWELL);

    let mut states = vec![back.state];
    for _ in 0..20 {
        states.push(h.tick(&readings(Some(0.8), Some(0.7), Some(0.8))).state);
    }
    assert_eq!(*states.last().unwrap(), AccessState::Normal);

    // One hop at a time on the way up
    let mut ups: Vec<AccessState> = states.clone();
    ups.dedup();
    assert_eq!(
        ups,
        vec![AccessState::Restrict, AccessState::Watch, AccessState::Normal]
    );
}

#[test]
fn test_no_flapping_around_boundary() {
    let mut h = Harness::new(&raw_config());
    h.tick(&uniform(0.6));
    assert_eq!(h.engine.state(), AccessState::Watch);
    h.wait(Duration::from_secs(5));

    for i in 0..20 {
        let value = if i % 2 == 0 { 0.69 } else { 0.71 };
        let d = h.tick(&uniform(value));
        assert_eq!(d.state, AccessState::Watch, "flapped at step {}", i);
        if value >= 0.70 {
            assert_eq!(d.reason, ReasonCode::R301_UPGRADE_HELD_HYSTERESIS);
        }
    }
}

#[test]
fn test_downward_crossing_is_immediate() {
    let mut h = Harness::new(&raw_config());
    assert_eq!(h.tick(&uniform(0.9)).state, AccessState::Normal);

    let d = h.tick(&uniform(0.69));
    assert_eq!(d.state, AccessState::Watch);
    assert_eq!(d.previous_state, AccessState::Normal);
    assert!(d.changed());
}

#[test]
fn test_downgrade_may_skip_states() {
    let mut h = Harness::new(&raw_config());
    h.tick(&uniform(0.9));

    let d = h.tick(&uniform(0.1));
    assert_eq!(d.previous_state, AccessState::Normal);
    assert_eq!(d.state, AccessState::Reauth);
    assert_eq!(d.reason, ReasonCode::R201_ENTERED_REAUTH);
}

#[test]
fn test_dwell_blocks_upgrade_not_downgrade() {
    let mut h = Harness::new(&raw_config());
    h.tick(&uniform(0.6));
    assert_eq!(h.engine.state(), AccessState::Watch);

    // Well above NORMAL + margin, but Watch was just entered
    let held = h.tick(&uniform(0.9));
    assert_eq!(held.state, AccessState::Watch);
    assert_eq!(held.reason, ReasonCode::R302_UPGRADE_HELD_DWELL);

    // A downgrade in the same window goes through
    let down = h.tick(&uniform(0.4));
    assert_eq!(down.state, AccessState::Restrict);

    h.wait(Duration::from_secs(2));
    let up = h.tick(&uniform(0.9));
    assert_eq!(up.state, AccessState::Watch);
    assert_eq!(up.reason, ReasonCode::R300_UPGRADED);
}

#[test]
fn test_reauth_is_latched() {
    let mut h = Harness::new(&raw_config());
    h.tick(&uniform(0.1));
    h.wait(Duration::from_secs(10));

    let d = h.tick(&uniform(0.95));
    assert_eq!(d.state, AccessState::Reauth);
    assert_eq!(d.reason, ReasonCode::R202_REAUTH_LATCHED);
}

#[test]
fn test_unlatched_reauth_climbs_one_hop() {
    let config = TrustConfig {
        reauth_latched: false,
        ..raw_config()
    };
    let mut h = Harness::new(&config);
    h.tick(&uniform(0.1));
    h.wait(Duration::from_secs(10));

    let d = h.tick(&uniform(0.95));
    assert_eq!(d.state, AccessState::Restrict);
    assert_eq!(d.reason, ReasonCode::R300_UPGRADED);
}

#[test]
fn test_reauth_override_from_every_state() {
    for value in [0.9, 0.6, 0.4, 0.1] {
        let mut h = Harness::new(&TrustConfig::default());
        h.tick(&uniform(value));

        let d = h.reauth();
        assert_eq!(d.state, AccessState::Normal);
        assert_eq!(d.trust, 0.8);
        assert_eq!(d.reason, ReasonCode::R400_REAUTH_OVERRIDE);
        assert!(d.recovery_active);

        let snapshot = h.engine.current();
        assert_eq!(snapshot.state, AccessState::Normal);
        assert_eq!(snapshot.trust, Some(0.8));
    }
}

#[test]
fn test_recovery_window_expires_without_action() {
    let mut h = Harness::new(&raw_config());
    h.tick(&uniform(0.1));
    h.reauth();

    // 0.72 fails strict NORMAL (0.75) inside the window
    let strict = h.tick(&uniform(0.72));
    assert!(strict.recovery_active);
    assert_eq!(strict.state, AccessState::Watch);

    // Just before the window closes: still strict
    h.wait(Duration::from_millis(59_000));
    let late = h.tick(&uniform(0.72));
    assert!(late.recovery_active);

    // After it: standard thresholds, 0.72 no longer degrades from Normal
    h.wait(Duration::from_secs(5));
    assert!(!h.engine.recovery_active(h.now));
    let after = h.tick(&uniform(0.9));
    assert!(!after.recovery_active);
    assert_eq!(after.state, AccessState::Normal);
    assert_eq!(h.tick(&uniform(0.72)).state, AccessState::Normal);
}

#[test]
fn test_reauth_does_not_advance_tick_counter() {
    let mut h = Harness::new(&TrustConfig::default());
    h.tick(&uniform(0.9));
    h.tick(&uniform(0.9));

    let d = h.reauth();
    assert_eq!(d.tick, 2);
    assert_eq!(h.tick(&uniform(0.9)).tick, 3);
}

#[test]
fn test_source_without_baseline_stays_neutral() {
    let mut config = raw_config();
    config
        .sources
        .insert(SignalSource::Behavior, SourceConfig::new(0.3).without_baseline());
    let mut h = Harness::new(&config);

    for _ in 0..15 {
        let d = h.tick(&readings(Some(0.9), Some(0.9), None));
        assert_eq!(d.contributions[&SignalSource::Behavior], 0.5);
    }
}

#[test]
fn test_normal_reachable_again_under_tight_margin() {
    let mut config = raw_config();
    config.thresholds.normal = 0.9;
    config.strict_thresholds.normal = 0.92;
    let mut h = Harness::new(&config);

    assert_eq!(h.tick(&uniform(0.6)).state, AccessState::Watch);
    h.wait(Duration::from_secs(2));

    let up = h.tick(&uniform(1.0));
    assert_eq!(up.previous_state, AccessState::Watch);
    assert_eq!(up.state, AccessState::Normal);
    assert_eq!(up.reason, ReasonCode::R300_UPGRADED);
}

#[test]
fn test_engine_rejects_unreachable_normal() {
    let mut config = raw_config();
    config.thresholds.normal = 0.98;
    config.strict_thresholds.normal = 0.98;
    assert!(matches!(
        TrustEngine::new(&config, Instant::now()),
        Err(TrustError::Config(_))
    ));
}
