//! Session configuration
//!
//! Loaded once at session start and immutable afterwards. Every engine
//! component validates it on construction and refuses to start otherwise.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::types::{AccessState, SignalSource, TrustError, TrustResult};
use crate::{
    DECAY_FLOOR, DECAY_TICKS_TO_FLOOR, DECISION_CHANNEL_CAPACITY, HYSTERESIS_MARGIN,
    MIN_DWELL_MS, NEUTRAL_CONFIDENCE, RECOVERY_DURATION_MS, RECOVERY_TRUST, SMOOTHING_ALPHA,
    STRICT_THRESHOLD_NORMAL, STRICT_THRESHOLD_RESTRICT, STRICT_THRESHOLD_WATCH,
    THRESHOLD_NORMAL, THRESHOLD_RESTRICT, THRESHOLD_WATCH, TICK_HZ, WEIGHT_BEHAVIOR,
    WEIGHT_FACE, WEIGHT_LIVENESS, WEIGHT_SUM_TOLERANCE,
};

/// How a producer's raw value maps onto [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreMapping {
    /// Already a confidence, only clamped
    #[default]
    Identity,
    /// `min` → 0.0, `max` → 1.0
    Linear { min: f64, max: f64 },
    /// Distance metric: `min` → 1.0, `max` → 0.0
    InverseLinear { min: f64, max: f64 },
}

/// Per-source fusion settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Fusion weight; all weights sum to 1.0
    pub weight: f64,
    /// Whether a baseline/template exists for this source.
    /// Without one, an absent reading contributes the neutral value
    /// instead of decaying.
    #[serde(default = "default_true")]
    pub has_baseline: bool,
    #[serde(default)]
    pub mapping: ScoreMapping,
}

impl SourceConfig {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            has_baseline: true,
            mapping: ScoreMapping::Identity,
        }
    }

    pub fn without_baseline(mut self) -> Self {
        self.has_baseline = false;
        self
    }

    pub fn with_mapping(mut self, mapping: ScoreMapping) -> Self {
        self.mapping = mapping;
        self
    }
}

/// Enter-thresholds (trust ≥) for each state above `Reauth`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub normal: f64,
    pub watch: f64,
    pub restrict: f64,
}

impl ThresholdTable {
    /// Normal-operation table
    pub fn standard() -> Self {
        Self {
            normal: THRESHOLD_NORMAL,
            watch: THRESHOLD_WATCH,
            restrict: THRESHOLD_RESTRICT,
        }
    }

    /// Tightened table used during a recovery window
    pub fn strict() -> Self {
        Self {
            normal: STRICT_THRESHOLD_NORMAL,
            watch: STRICT_THRESHOLD_WATCH,
            restrict: STRICT_THRESHOLD_RESTRICT,
        }
    }

    /// Trust needed to be in `state`. `Reauth` accepts anything.
    pub fn enter_threshold(&self, state: AccessState) -> f64 {
        match state {
            AccessState::Normal => self.normal,
            AccessState::Watch => self.watch,
            AccessState::Restrict => self.restrict,
            AccessState::Reauth => 0.0,
        }
    }

    /// State justified by `trust` alone, ignoring hysteresis and dwell
    pub fn candidate(&self, trust: f64) -> AccessState {
        if trust >= self.normal {
            AccessState::Normal
        } else if trust >= self.watch {
            AccessState::Watch
        } else if trust >= self.restrict {
            AccessState::Restrict
        } else {
            AccessState::Reauth
        }
    }

    fn validate(&self, name: &str) -> TrustResult<()> {
        let ordered = self.normal <= 1.0
            && self.normal > self.watch
            && self.watch > self.restrict
            && self.restrict > 0.0;
        if !ordered {
            return Err(TrustError::Config(format!(
                "{name} must satisfy 1 >= normal > watch > restrict > 0, got {} / {} / {}",
                self.normal, self.watch, self.restrict
            )));
        }
        Ok(())
    }
}

/// Linear decay of absent sources
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayConfig {
    /// Absent ticks until the substitute reaches the floor
    pub ticks_to_floor: u32,
    /// Lowest substitute value, strictly positive
    pub floor: f64,
    /// Substitute for sources without a baseline, and the starting
    /// point for baseline sources that have not reported yet
    pub neutral: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            ticks_to_floor: DECAY_TICKS_TO_FLOOR,
            floor: DECAY_FLOOR,
            neutral: NEUTRAL_CONFIDENCE,
        }
    }
}

/// Post re-authentication monitoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    pub duration_ms: u64,
    /// Trust forced on re-auth success
    pub trust: f64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            duration_ms: RECOVERY_DURATION_MS,
            trust: RECOVERY_TRUST,
        }
    }
}

/// Complete per-session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// EMA factor applied to the newest raw trust
    pub smoothing_alpha: f64,
    /// Extra trust required to move up a state
    pub hysteresis_margin: f64,
    /// Minimum time in a state before moving up
    pub min_dwell_ms: u64,
    /// Verification cadence
    pub tick_hz: f64,
    pub initial_state: AccessState,
    /// Leave `Reauth` only through a re-auth success event
    pub reauth_latched: bool,
    /// Decision broadcast capacity per session
    pub channel_capacity: usize,
    pub sources: BTreeMap<SignalSource, SourceConfig>,
    pub decay: DecayConfig,
    pub thresholds: ThresholdTable,
    pub strict_thresholds: ThresholdTable,
    pub recovery: RecoveryConfig,
}

impl Default for TrustConfig {
    fn default() -> Self {
        let sources = BTreeMap::from([
            (SignalSource::Face, SourceConfig::new(WEIGHT_FACE)),
            (SignalSource::Liveness, SourceConfig::new(WEIGHT_LIVENESS)),
            (SignalSource::Behavior, SourceConfig::new(WEIGHT_BEHAVIOR)),
        ]);

        Self {
            smoothing_alpha: SMOOTHING_ALPHA,
            hysteresis_margin: HYSTERESIS_MARGIN,
            min_dwell_ms: MIN_DWELL_MS,
            tick_hz: TICK_HZ,
            initial_state: AccessState::Normal,
            reauth_latched: true,
            channel_capacity: DECISION_CHANNEL_CAPACITY,
            sources,
            decay: DecayConfig::default(),
            thresholds: ThresholdTable::standard(),
            strict_thresholds: ThresholdTable::strict(),
            recovery: RecoveryConfig::default(),
        }
    }
}

impl TrustConfig {
    /// Validate all parameters.
    pub fn validate(&self) -> TrustResult<()> {
        self.validate_sources()?;

        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(TrustError::Config(format!(
                "smoothing_alpha must be in (0, 1], got {}",
                self.smoothing_alpha
            )));
        }
        if self.decay.ticks_to_floor == 0 {
            return Err(TrustError::Config(
                "decay.ticks_to_floor must be > 0".to_string(),
            ));
        }
        if !(self.decay.floor > 0.0 && self.decay.floor < 1.0) {
            return Err(TrustError::Config(format!(
                "decay.floor must be in (0, 1), got {}",
                self.decay.floor
            )));
        }
        if !(0.0..=1.0).contains(&self.decay.neutral) {
            return Err(TrustError::Config(format!(
                "decay.neutral must be in [0, 1], got {}",
                self.decay.neutral
            )));
        }

        self.thresholds.validate("thresholds")?;
        self.strict_thresholds.validate("strict_thresholds")?;
        let strict_looser = self.strict_thresholds.normal < self.thresholds.normal
            || self.strict_thresholds.watch < self.thresholds.watch
            || self.strict_thresholds.restrict < self.thresholds.restrict;
        if strict_looser {
            return Err(TrustError::Config(
                "strict_thresholds must not be lower than thresholds".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.hysteresis_margin) {
            return Err(TrustError::Config(format!(
                "hysteresis_margin must be in [0, 1), got {}",
                self.hysteresis_margin
            )));
        }
        // An upgrade into Normal needs trust >= normal + margin
        for (name, table) in [
            ("thresholds", &self.thresholds),
            ("strict_thresholds", &self.strict_thresholds),
        ] {
            if table.normal + self.hysteresis_margin > 1.0 {
                return Err(TrustError::Config(format!(
                    "{name}.normal + hysteresis_margin must not exceed 1.0, got {} + {}",
                    table.normal, self.hysteresis_margin
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.recovery.trust) {
            return Err(TrustError::Config(format!(
                "recovery.trust must be in [0, 1], got {}",
                self.recovery.trust
            )));
        }
        if self.recovery.duration_ms == 0 {
            return Err(TrustError::Config(
                "recovery.duration_ms must be > 0".to_string(),
            ));
        }
        if !(MIN_TICK_HZ..=MAX_TICK_HZ).contains(&self.tick_hz) {
            return Err(TrustError::Config(format!(
                "tick_hz must be in [{MIN_TICK_HZ}, {MAX_TICK_HZ}], got {}",
                self.tick_hz
            )));
        }
        if !(1..=MAX_CHANNEL_CAPACITY).contains(&self.channel_capacity) {
            return Err(TrustError::Config(format!(
                "channel_capacity must be in [1, {MAX_CHANNEL_CAPACITY}], got {}",
                self.channel_capacity
            )));
        }
        Ok(())
    }

    fn validate_sources(&self) -> TrustResult<()> {
        if self.sources.is_empty() {
            return Err(TrustError::Config(
                "at least one signal source must be configured".to_string(),
            ));
        }

        let mut sum = 0.0;
        for (source, cfg) in &self.sources {
            if !cfg.weight.is_finite() || cfg.weight < 0.0 {
                return Err(TrustError::Config(format!(
                    "weight for {source} must be a non-negative number, got {}",
                    cfg.weight
                )));
            }
            match cfg.mapping {
                ScoreMapping::Identity => {}
                ScoreMapping::Linear { min, max } | ScoreMapping::InverseLinear { min, max } => {
                    if !(min.is_finite() && max.is_finite() && min < max) {
                        return Err(TrustError::Config(format!(
                            "mapping for {source} needs min < max, got {min} / {max}"
                        )));
                    }
                }
            }
            sum += cfg.weight;
        }

        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(TrustError::Config(format!(
                "source weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz)
    }

    pub fn min_dwell(&self) -> Duration {
        Duration::from_millis(self.min_dwell_ms)
    }

    pub fn recovery_duration(&self) -> Duration {
        Duration::from_millis(self.recovery.duration_ms)
    }

    /// Parse and validate TOML
    pub fn from_toml(text: &str) -> TrustResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| TrustError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate JSON
    pub fn from_json(text: &str) -> TrustResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| TrustError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from disk; `.json` files are JSON, everything else TOML
    pub fn load(path: impl AsRef<Path>) -> TrustResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TrustError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_toml(&text)
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> TrustResult<String> {
        toml::to_string_pretty(self).map_err(|e| TrustError::ConfigParse(e.to_string()))
    }
}

/// Bounds that keep the tick period representable and non-zero
const MIN_TICK_HZ: f64 = 0.001;
const MAX_TICK_HZ: f64 = 1000.0;

/// Decisions buffered per subscriber before it lags
const MAX_CHANNEL_CAPACITY: usize = 1 << 16;

fn default_true() -> bool {
    true
}
