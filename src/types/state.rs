//! Access state definitions

use serde::{Deserialize, Serialize};

/// The four ordered access states.
///
/// Declaration order gives the trust ordering: `Normal > Watch > Restrict > Reauth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessState {
    /// Identity lost, explicit re-authentication required
    Reauth,
    /// Sensitive actions blocked
    Restrict,
    /// Confidence slipping, surface is monitored
    Watch,
    /// Full access
    Normal,
}

impl AccessState {
    /// One hop up, or `None` from `Normal`
    pub fn higher(&self) -> Option<AccessState> {
        match self {
            AccessState::Reauth => Some(AccessState::Restrict),
            AccessState::Restrict => Some(AccessState::Watch),
            AccessState::Watch => Some(AccessState::Normal),
            AccessState::Normal => None,
        }
    }

    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            AccessState::Normal => "\x1b[32m",   // Green
            AccessState::Watch => "\x1b[33m",    // Yellow
            AccessState::Restrict => "\x1b[35m", // Magenta
            AccessState::Reauth => "\x1b[31m",   // Red
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    /// Get emoji for state
    pub fn emoji(&self) -> &'static str {
        match self {
            AccessState::Normal => "🔓",
            AccessState::Watch => "👁",
            AccessState::Restrict => "🔶",
            AccessState::Reauth => "🔒",
        }
    }
}

impl std::fmt::Display for AccessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AccessState::Normal => "NORMAL",
            AccessState::Watch => "WATCH",
            AccessState::Restrict => "RESTRICT",
            AccessState::Reauth => "REAUTH",
        };
        write!(f, "{}", name)
    }
}
