//! Recovery Monitor: bounded strict-threshold window after re-authentication

use std::time::{Duration, Instant};
use crate::types::{ThresholdTable, TrustConfig};

/// Open recovery window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryWindow {
    pub started_at: Instant,
    pub duration: Duration,
}

impl RecoveryWindow {
    /// Time left at `now` (zero once expired)
    pub fn remaining(&self, now: Instant) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }

    /// Strict thresholds apply for exactly `duration` after `started_at`
    pub fn is_open(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) < self.duration
    }
}

/// Tracks the post re-auth window and picks the threshold table
#[derive(Debug, Clone)]
pub struct RecoveryMonitor {
    normal: ThresholdTable,
    strict: ThresholdTable,
    duration: Duration,
    recovery_trust: f64,
    window: Option<RecoveryWindow>,
}

impl RecoveryMonitor {
    pub fn new(config: &TrustConfig) -> Self {
        Self {
            normal: config.thresholds,
            strict: config.strict_thresholds,
            duration: config.recovery_duration(),
            recovery_trust: config.recovery.trust,
            window: None,
        }
    }

    /// Open (or restart) the window. Returns the trust to force.
    pub fn on_reauth_success(&mut self, now: Instant) -> f64 {
        let window = RecoveryWindow {
            started_at: now,
            duration: self.duration,
        };
        self.window = Some(window);
        tracing::info!(
            duration_ms = self.duration.as_millis() as u64,
            "recovery window opened"
        );
        self.recovery_trust
    }

    /// Whether strict thresholds are in force at `now`
    pub fn is_active(&self, now: Instant) -> bool {
        self.window.map(|w| w.is_open(now)).unwrap_or(false)
    }

    /// Drop an expired window. Returns true if one was closed.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.window {
            Some(w) if !w.is_open(now) => {
                self.window = None;
                tracing::info!("recovery window closed, normal thresholds restored");
                true
            }
            _ => false,
        }
    }

    /// Threshold table in force at `now`
    pub fn thresholds(&self, now: Instant) -> &ThresholdTable {
        if self.is_active(now) {
            &self.strict
        } else {
            &self.normal
        }
    }

    pub fn window(&self) -> Option<RecoveryWindow> {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_by_default() {
        let monitor = RecoveryMonitor::new(&TrustConfig::default());
        let now = Instant::now();
        assert!(!monitor.is_active(now));
        assert_eq!(monitor.thresholds(now), &ThresholdTable::standard());
    }

    #[test]
    fn test_window_lasts_exactly_duration() {
        let mut monitor = RecoveryMonitor::new(&TrustConfig::default());
        let t0 = Instant::now();

        let trust = monitor.on_reauth_success(t0);
        assert_eq!(trust, 0.8);

        assert!(monitor.is_active(t0));
        assert!(monitor.is_active(t0 + Duration::from_millis(59_999)));
        assert_eq!(monitor.thresholds(t0 + Duration::from_secs(30)), &ThresholdTable::strict());

        let end = t0 + Duration::from_secs(60);
        assert!(!monitor.is_active(end));
        assert_eq!(monitor.thresholds(end), &ThresholdTable::standard());
    }

    #[test]
    fn test_expire_closes_once() {
        let mut monitor = RecoveryMonitor::new(&TrustConfig::default());
        let t0 = Instant::now();
        monitor.on_reauth_success(t0);

        assert!(!monitor.expire(t0 + Duration::from_secs(10)));
        assert!(monitor.expire(t0 + Duration::from_secs(61)));
        assert!(!monitor.expire(t0 + Duration::from_secs(62)));
        assert!(monitor.window().is_none());
    }

    #[test]
    fn test_second_reauth_restarts_window() {
        let mut monitor = RecoveryMonitor::new(&TrustConfig::default());
        let t0 = Instant::now();
        monitor.on_reauth_success(t0);
        monitor.on_reauth_success(t0 + Duration::from_secs(50));

        assert!(monitor.is_active(t0 + Duration::from_secs(100)));
        let window = monitor.window().unwrap();
        assert_eq!(
            window.remaining(t0 + Duration::from_secs(100)),
            Duration::from_secs(10)
        );
    }
}
