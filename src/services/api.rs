//! API request and response types for the JSON API.

use serde::{Deserialize, Serialize};

use crate::entity::{OutputFlags, RestorePolicy, TurnoutType};
use crate::traits::TrackSignal;

// ============================================================================
// Response Types
// ============================================================================

/// API response wrapper for consistent JSON structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present when success=true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present when success=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Track power state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerResponse {
    /// Whether the OPS output is on
    pub enabled: bool,
    /// OPS current draw
    pub current_ma: u32,
    /// Request waiting for the next power check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<bool>,
}

impl PowerResponse {
    /// Snapshot of a track driver plus the pending request.
    pub fn new(track: &dyn TrackSignal, pending: Option<bool>) -> Self {
        Self {
            enabled: track.ops_enabled(),
            current_ma: track.ops_current_ma(),
            pending,
        }
    }
}

/// Raw DCC++ command result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Response text, possibly empty
    pub response: String,
}

// ============================================================================
// Request Types
// ============================================================================

/// Body of `PUT /api/power`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SetPowerRequest {
    /// Requested OPS output state
    pub enabled: bool,
}

/// Body of `PUT /api/outputs/:id`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OutputRequest {
    /// GPIO pin
    pub pin: u16,
    /// Drive the pin low when active
    #[serde(default)]
    pub inverted: bool,
    /// Force a fixed state on startup instead of restoring the last one
    #[serde(default)]
    pub force_state: bool,
    /// State forced on startup (only with `force_state`)
    #[serde(default)]
    pub default_state: bool,
}

impl OutputRequest {
    /// Flag byte for the request.
    pub fn flags(&self) -> OutputFlags {
        let policy = match (self.force_state, self.default_state) {
            (false, _) => RestorePolicy::RestorePrevious,
            (true, true) => RestorePolicy::ForceActive,
            (true, false) => RestorePolicy::ForceInactive,
        };
        OutputFlags::new(self.inverted, policy)
    }
}

/// Body of `PUT /api/turnouts/:id`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TurnoutRequest {
    /// DCC accessory address
    pub address: u16,
    /// Turnout type (0 left, 1 right, 2 wye, 3 multi)
    #[serde(default)]
    pub kind: u8,
}

impl TurnoutRequest {
    /// Decoded turnout type.
    pub fn turnout_type(&self) -> Option<TurnoutType> {
        TurnoutType::try_from(self.kind).ok()
    }
}

/// Body of `PUT /api/sensors/:id`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SensorRequest {
    /// GPIO pin
    pub pin: u16,
    /// Enable the internal pull-up
    #[serde(default)]
    pub pull_up: bool,
}

/// Body of `POST /api/command`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Frame interior, e.g. `Z 1 1`, or one or more bracketed frames
    pub command: String,
}
