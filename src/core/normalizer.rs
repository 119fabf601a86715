//! Score Normalizer: maps each producer's raw value onto [0, 1]
//!
//! Pure and total. Out-of-range input is clamped, never rejected.

use std::collections::BTreeMap;
use crate::types::{ScoreMapping, SignalSource, TrustConfig};

/// Per-source mapping table
#[derive(Debug, Clone, Default)]
pub struct ScoreNormalizer {
    mappings: BTreeMap<SignalSource, ScoreMapping>,
}

impl ScoreNormalizer {
    /// Identity mapping for every source
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the configured per-source mappings
    pub fn from_config(config: &TrustConfig) -> Self {
        Self {
            mappings: config
                .sources
                .iter()
                .map(|(source, cfg)| (*source, cfg.mapping))
                .collect(),
        }
    }

    /// Canonical confidence for `raw` from `source`. Unknown sources use identity.
    pub fn normalize(&self, source: SignalSource, raw: f64) -> f64 {
        let mapping = self.mappings.get(&source).copied().unwrap_or_default();
        apply_mapping(mapping, raw)
    }
}

/// Apply one mapping. NaN maps to 0.0.
pub fn apply_mapping(mapping: ScoreMapping, raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }

    let mapped = match mapping {
        ScoreMapping::Identity => raw,
        ScoreMapping::Linear { min, max } => (raw - min) / (max - min),
        ScoreMapping::InverseLinear { min, max } => (max - raw) / (max - min),
    };

    if mapped.is_nan() {
        0.0
    } else {
        mapped.clamp(0.0, 1.0)
    }
}
