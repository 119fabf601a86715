//! Reason codes for trust decisions and state changes

use serde::{Deserialize, Serialize};

/// Why the access state is what it is after a tick or event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // R100: Session
    // =========================================================================
    /// First decision of the session
    R100_SESSION_START,
    /// Trust supports the current state
    R101_STATE_HELD,

    // =========================================================================
    // R200: Degradation (never delayed)
    // =========================================================================
    /// Trust fell below the current state's threshold
    R200_DEGRADED,
    /// Trust fell below the lowest threshold
    R201_ENTERED_REAUTH,
    /// In REAUTH, waiting for explicit re-authentication
    R202_REAUTH_LATCHED,

    // =========================================================================
    // R300: Upgrades (one hop at a time)
    // =========================================================================
    /// Moved up one state
    R300_UPGRADED,
    /// Trust above threshold but not above threshold + margin
    R301_UPGRADE_HELD_HYSTERESIS,
    /// Trust justifies an upgrade but dwell time has not elapsed
    R302_UPGRADE_HELD_DWELL,

    // =========================================================================
    // R400: Re-authentication
    // =========================================================================
    /// Re-auth succeeded, state forced to NORMAL, recovery window opened
    R400_REAUTH_OVERRIDE,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R100_SESSION_START => "R100_SESSION_START",
            Self::R101_STATE_HELD => "R101_STATE_HELD",
            Self::R200_DEGRADED => "R200_DEGRADED",
            Self::R201_ENTERED_REAUTH => "R201_ENTERED_REAUTH",
            Self::R202_REAUTH_LATCHED => "R202_REAUTH_LATCHED",
            Self::R300_UPGRADED => "R300_UPGRADED",
            Self::R301_UPGRADE_HELD_HYSTERESIS => "R301_UPGRADE_HELD_HYSTERESIS",
            Self::R302_UPGRADE_HELD_DWELL => "R302_UPGRADE_HELD_DWELL",
            Self::R400_REAUTH_OVERRIDE => "R400_REAUTH_OVERRIDE",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R100_SESSION_START => "Session started",
            Self::R101_STATE_HELD => "State unchanged",
            Self::R200_DEGRADED => "Trust dropped - access tightened",
            Self::R201_ENTERED_REAUTH => "Trust lost - re-authentication required",
            Self::R202_REAUTH_LATCHED => "Waiting for re-authentication",
            Self::R300_UPGRADED => "Trust recovered - access loosened",
            Self::R301_UPGRADE_HELD_HYSTERESIS => "Upgrade held by hysteresis margin",
            Self::R302_UPGRADE_HELD_DWELL => "Upgrade held by minimum dwell time",
            Self::R400_REAUTH_OVERRIDE => "Re-authenticated - recovery window open",
        }
    }

    /// Did this decision change the state?
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            Self::R200_DEGRADED
                | Self::R201_ENTERED_REAUTH
                | Self::R300_UPGRADED
                | Self::R400_REAUTH_OVERRIDE
        )
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
