//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{FocusStatus, MusicTrack};

/// API response structure for command endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub focus: FocusStatus,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, focus: FocusStatus) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            focus,
        }
    }

    /// Create a response whose status word is derived from the timer phase
    pub fn from_focus(message: String, focus: FocusStatus) -> Self {
        let status = if focus.is_paused {
            "paused"
        } else if focus.is_running {
            "running"
        } else {
            "idle"
        };
        Self::new(status.to_string(), message, focus)
    }
}

/// Full status response with server metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub focus: FocusStatus,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Music catalog response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicOptionsResponse {
    pub options: Vec<MusicTrack>,
    pub selected: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Body of POST /focus/open
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenRequest {
    pub duration_seconds: Option<u64>,
}

/// Body of POST /audio/volume
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeRequest {
    pub percent: u32,
}

/// Body of POST /audio/mute
#[derive(Debug, Clone, Deserialize)]
pub struct MuteRequest {
    pub muted: bool,
}

/// Body of POST /audio/track
#[derive(Debug, Clone, Deserialize)]
pub struct TrackRequest {
    pub track_id: String,
}

/// Body of POST /audio/music
#[derive(Debug, Clone, Deserialize)]
pub struct MusicEnabledRequest {
    pub enabled: bool,
}
