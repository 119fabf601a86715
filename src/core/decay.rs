//! Staleness / Decay Policy
//!
//! An absent source is replaced by a substitute that falls linearly from its
//! last known good value to the floor over `ticks_to_floor` ticks:
//!
//! ```text
//! missing_ticks += 1
//! factor        = max(0, 1 - missing_ticks / N)
//! substitute    = max(floor, last_good * factor)
//! ```
//!
//! Recovery is asymmetric: the first present reading resets the counter and
//! replaces the last known good value immediately.

use crate::types::DecayConfig;

/// Per-source staleness bookkeeping, owned by the fusion engine
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTrack {
    /// Consecutive absent ticks
    pub missing_ticks: u32,
    /// Last normalized present value
    pub last_good: Option<f64>,
    /// Fixed at configuration time
    pub has_baseline: bool,
}

impl SourceTrack {
    pub fn new(has_baseline: bool) -> Self {
        Self {
            missing_ticks: 0,
            last_good: None,
            has_baseline,
        }
    }

    /// Record a present value, resetting decay
    pub fn observe(&mut self, value: f64) {
        self.missing_ticks = 0;
        self.last_good = Some(value);
    }
}

/// Linear decay to a floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPolicy {
    ticks_to_floor: u32,
    floor: f64,
    neutral: f64,
}

impl DecayPolicy {
    /// Create a policy; `config` is assumed validated
    pub fn new(config: &DecayConfig) -> Self {
        Self {
            ticks_to_floor: config.ticks_to_floor.max(1),
            floor: config.floor,
            neutral: config.neutral,
        }
    }

    /// Substitute confidence for an absent tick. Increments `missing_ticks`.
    pub fn substitute(&self, track: &mut SourceTrack) -> f64 {
        track.missing_ticks = track.missing_ticks.saturating_add(1);

        if !track.has_baseline {
            return self.neutral;
        }

        // A baseline source that has not reported yet decays from neutral
        let last_good = track.last_good.unwrap_or(self.neutral);
        let factor = (1.0 - track.missing_ticks as f64 / self.ticks_to_floor as f64).max(0.0);
        (last_good * factor).max(self.floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(ticks: u32, floor: f64) -> DecayPolicy {
        DecayPolicy::new(&DecayConfig {
            ticks_to_floor: ticks,
            floor,
            neutral: 0.5,
        })
    }

    #[test]
    fn test_linear_decay_steps() {
        let policy = policy(10, 0.1);
        let mut track = SourceTrack::new(true);
        track.observe(0.8);

        let first = policy.substitute(&mut track);
        assert!((first - 0.72).abs() < 1e-12);
        assert_eq!(track.missing_ticks, 1);

        let second = policy.substitute(&mut track);
        assert!((second - 0.64).abs() < 1e-12);
    }

    #[test]
    fn test_decay_monotonic_and_reaches_floor_in_n_ticks() {
        let policy = policy(10, 0.05);
        let mut track = SourceTrack::new(true);
        track.observe(1.0);

        let mut prev = 1.0;
        for tick in 1..=10 {
            let value = policy.substitute(&mut track);
            assert!(value <= prev, "tick {}: {} > {}", tick, value, prev);
            if tick < 10 {
                assert!(value > 0.05, "reached floor early at tick {}", tick);
            } else {
                assert_eq!(value, 0.05);
            }
            prev = value;
        }

        // Stays at the floor afterwards
        for _ in 0..5 {
            assert_eq!(policy.substitute(&mut track), 0.05);
        }
    }

    #[test]
    fn test_floor_is_never_zero() {
        let policy = policy(3, 0.1);
        let mut track = SourceTrack::new(true);
        track.observe(0.0);
        assert_eq!(policy.substitute(&mut track), 0.1);
    }

    #[test]
    fn test_observe_resets_immediately() {
        let policy = policy(10, 0.1);
        let mut track = SourceTrack::new(true);
        track.observe(0.9);
        for _ in 0..6 {
            policy.substitute(&mut track);
        }
        assert_eq!(track.missing_ticks, 6);

        track.observe(0.85);
        assert_eq!(track.missing_ticks, 0);
        assert_eq!(track.last_good, Some(0.85));

        // Next absence decays from the new value, not the old residue
        let value = policy.substitute(&mut track);
        assert!((value - 0.765).abs() < 1e-12);
    }

    #[test]
    fn test_no_baseline_contributes_neutral() {
        let policy = policy(10, 0.1);
        let mut track = SourceTrack::new(false);
        for _ in 0..50 {
            assert_eq!(policy.substitute(&mut track), 0.5);
        }
        assert_eq!(track.missing_ticks, 50);
    }

    #[test]
    fn test_unseen_baseline_source_decays_from_neutral() {
        let policy = policy(10, 0.1);
        let mut track = SourceTrack::new(true);
        assert!((policy.substitute(&mut track) - 0.45).abs() < 1e-12);
    }
}
