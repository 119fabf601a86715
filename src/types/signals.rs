//! Signal readings handed to the engine once per tick

use serde::{Deserialize, Serialize};

/// Independent biometric channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Face match against the enrolled template
    Face,
    /// Liveness / landmark analysis
    Liveness,
    /// Keystroke and mouse dynamics
    Behavior,
}

impl SignalSource {
    /// Every known source, in fusion order
    pub const ALL: [SignalSource; 3] = [
        SignalSource::Face,
        SignalSource::Liveness,
        SignalSource::Behavior,
    ];

    /// Lowercase name used in config keys and CLI input
    pub fn name(&self) -> &'static str {
        match self {
            SignalSource::Face => "face",
            SignalSource::Liveness => "liveness",
            SignalSource::Behavior => "behavior",
        }
    }

    /// Parse a source name (case insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One producer's output for the current tick.
///
/// `value == None` means the signal was not available this tick. A producer
/// failure is reported the same way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalReading {
    pub source: SignalSource,
    pub value: Option<f64>,
}

impl SignalReading {
    /// Reading with a value
    pub fn present(source: SignalSource, value: f64) -> Self {
        Self {
            source,
            value: Some(value),
        }
    }

    /// Reading for a source that has nothing this tick
    pub fn absent(source: SignalSource) -> Self {
        Self {
            source,
            value: None,
        }
    }

    /// Usable value, if any. Non-finite values count as absent.
    pub fn usable_value(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }

    pub fn is_present(&self) -> bool {
        self.usable_value().is_some()
    }
}
