//! Signal producer boundary
//!
//! Producers run on their own schedule (camera polling, input hooks). The loop
//! only ever asks for a latest-value snapshot and never waits on a producer.

use std::collections::HashMap;
use std::sync::Mutex;
use crate::types::{SignalReading, SignalSource};

/// Source of per-tick readings. Must not block and must not fail:
/// missing data is returned as an absent reading.
pub trait SignalProducer: Send + Sync {
    fn reading(&self, source: SignalSource) -> SignalReading;
}

/// Latest-value slots that external producers write into.
///
/// Each tick takes the slot, so a producer that has not submitted anything
/// since the previous tick is reported as absent.
#[derive(Debug, Default)]
pub struct LatestReadings {
    slots: Mutex<HashMap<SignalSource, f64>>,
}

impl LatestReadings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reading; an absent reading clears the slot
    pub fn submit(&self, reading: SignalReading) {
        let mut slots = self.lock();
        match reading.usable_value() {
            Some(value) => {
                slots.insert(reading.source, value);
            }
            None => {
                slots.remove(&reading.source);
            }
        }
    }

    /// Number of sources with a pending value
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SignalSource, f64>> {
        // A poisoned slot map still holds plain f64s
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SignalProducer for LatestReadings {
    fn reading(&self, source: SignalSource) -> SignalReading {
        match self.lock().remove(&source) {
            Some(value) => SignalReading::present(source, value),
            None => SignalReading::absent(source),
        }
    }
}

/// Poll every source once
pub fn collect_readings(producer: &dyn SignalProducer, sources: &[SignalSource]) -> Vec<SignalReading> {
    sources.iter().map(|s| producer.reading(*s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_is_consumed_per_tick() {
        let latest = LatestReadings::new();
        latest.submit(SignalReading::present(SignalSource::Face, 0.9));

        assert_eq!(latest.reading(SignalSource::Face).value, Some(0.9));
        assert_eq!(latest.reading(SignalSource::Face).value, None);
    }

    #[test]
    fn test_newest_submission_wins() {
        let latest = LatestReadings::new();
        latest.submit(SignalReading::present(SignalSource::Behavior, 0.2));
        latest.submit(SignalReading::present(SignalSource::Behavior, 0.6));
        assert_eq!(latest.reading(SignalSource::Behavior).value, Some(0.6));
    }

    #[test]
    fn test_absent_submission_clears() {
        let latest = LatestReadings::new();
        latest.submit(SignalReading::present(SignalSource::Liveness, 0.7));
        latest.submit(SignalReading::absent(SignalSource::Liveness));
        assert_eq!(latest.pending(), 0);
        assert!(!latest.reading(SignalSource::Liveness).is_present());
    }

    #[test]
    fn test_collect_readings_covers_all_sources() {
        let latest = LatestReadings::new();
        latest.submit(SignalReading::present(SignalSource::Face, 0.5));

        let readings = collect_readings(&latest, &SignalSource::ALL);
        assert_eq!(readings.len(), 3);
        assert!(readings[0].is_present());
        assert!(!readings[1].is_present());
        assert!(!readings[2].is_present());
    }
}
