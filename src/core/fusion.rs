//! Fusion Engine: weighted combination + exponential smoothing
//!
//! Per tick:
//! 1. Each configured source yields a confidence: normalized if present,
//!    decayed substitute if absent
//! 2. raw = Σ weight[source] · value[source]
//! 3. smoothed = α · raw + (1 - α) · smoothed_prev (first tick: smoothed = raw)

use std::collections::BTreeMap;
use crate::core::decay::{DecayPolicy, SourceTrack};
use crate::core::normalizer::ScoreNormalizer;
use crate::types::{SignalReading, SignalSource, TrustConfig, TrustResult};

/// Result of one fusion tick
#[derive(Debug, Clone, PartialEq)]
pub struct FusionOutput {
    /// Weighted sum before smoothing
    pub raw: f64,
    /// EMA-filtered trust
    pub smoothed: f64,
    /// Value used for each source
    pub contributions: BTreeMap<SignalSource, f64>,
}

/// Fusion state for one session
#[derive(Debug, Clone)]
pub struct FusionEngine {
    weights: BTreeMap<SignalSource, f64>,
    alpha: f64,
    normalizer: ScoreNormalizer,
    decay: DecayPolicy,
    tracks: BTreeMap<SignalSource, SourceTrack>,
    smoothed: Option<f64>,
}

impl FusionEngine {
    /// Create engine. Fails if the weights do not sum to 1.0 or any other
    /// parameter is out of range.
    pub fn new(config: &TrustConfig) -> TrustResult<Self> {
        config.validate()?;

        Ok(Self {
            weights: config
                .sources
                .iter()
                .map(|(source, cfg)| (*source, cfg.weight))
                .collect(),
            alpha: config.smoothing_alpha,
            normalizer: ScoreNormalizer::from_config(config),
            decay: DecayPolicy::new(&config.decay),
            tracks: config
                .sources
                .iter()
                .map(|(source, cfg)| (*source, SourceTrack::new(cfg.has_baseline)))
                .collect(),
            smoothed: None,
        })
    }

    /// Fuse one tick of readings.
    ///
    /// Configured sources missing from `readings` count as absent. Readings for
    /// unconfigured sources are ignored. If a source appears twice, the last
    /// reading wins.
    pub fn tick(&mut self, readings: &[SignalReading]) -> FusionOutput {
        let mut latest: BTreeMap<SignalSource, Option<f64>> = BTreeMap::new();
        for reading in readings {
            if self.weights.contains_key(&reading.source) {
                latest.insert(reading.source, reading.usable_value());
            } else {
                tracing::debug!(source = %reading.source, "ignoring reading for unconfigured source");
            }
        }

        let mut contributions = BTreeMap::new();
        let mut raw = 0.0;

        for (source, weight) in &self.weights {
            let Some(track) = self.tracks.get_mut(source) else {
                continue;
            };

            let value = match latest.get(source).copied().flatten() {
                Some(v) => {
                    let normalized = self.normalizer.normalize(*source, v);
                    track.observe(normalized);
                    normalized
                }
                None => self.decay.substitute(track),
            };

            raw += weight * value;
            contributions.insert(*source, value);
        }

        let raw = raw.clamp(0.0, 1.0);
        let smoothed = match self.smoothed {
            Some(prev) => self.alpha * raw + (1.0 - self.alpha) * prev,
            None => raw,
        }
        .clamp(0.0, 1.0);

        self.smoothed = Some(smoothed);

        FusionOutput {
            raw,
            smoothed,
            contributions,
        }
    }

    /// Smoothed trust, `None` before the first tick
    pub fn smoothed(&self) -> Option<f64> {
        self.smoothed
    }

    /// Overwrite the smoothed trust (re-auth override)
    pub fn force_trust(&mut self, trust: f64) {
        self.smoothed = Some(trust.clamp(0.0, 1.0));
    }

    /// Consecutive absent ticks for a source
    pub fn missing_ticks(&self, source: SignalSource) -> Option<u32> {
        self.tracks.get(&source).map(|t| t.missing_ticks)
    }

    /// Last known good value for a source
    pub fn last_good(&self, source: SignalSource) -> Option<f64> {
        self.tracks.get(&source).and_then(|t| t.last_good)
    }
}
