//! HTTP endpoint handlers

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{debug, error, warn};

use super::{
    responses::{
        ApiResponse, HealthResponse, MusicEnabledRequest, MusicOptionsResponse, MuteRequest,
        OpenRequest, StatusResponse, TrackRequest, VolumeRequest,
    },
    ApiContext,
};
use crate::state::{FocusStatus, SessionError};

pub type CommandResult = Result<Json<ApiResponse>, StatusCode>;

/// Turn a session command result into a JSON response
fn respond(result: Result<FocusStatus, String>, message: &str) -> CommandResult {
    match result {
        Ok(focus) => {
            debug!("{} - remaining {}", message, focus.remaining_display);
            Ok(Json(ApiResponse::from_focus(message.to_string(), focus)))
        }
        Err(e) => {
            error!("{} failed: {}", message, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /focus/open - Show the timer, optionally with a duration.
/// An empty body means defaults; a body that is not a valid request is a 400.
pub async fn open_handler(State(ctx): State<ApiContext>, body: Bytes) -> CommandResult {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        OpenRequest::default()
    } else {
        serde_json::from_slice::<OpenRequest>(&body).map_err(|e| {
            warn!("Malformed open request: {}", e);
            StatusCode::BAD_REQUEST
        })?
    };
    respond(ctx.session.open_focus(request.duration_seconds), "Focus opened")
}

/// Handle POST /focus/close - Hide, reset and cancel the timer
pub async fn close_handler(State(ctx): State<ApiContext>) -> CommandResult {
    respond(ctx.session.close_focus(), "Focus closed")
}

/// Handle POST /focus/toggle - Start, pause or resume
pub async fn toggle_handler(State(ctx): State<ApiContext>) -> CommandResult {
    respond(ctx.session.toggle_play(), "Focus toggled")
}

/// Handle POST /focus/pause
pub async fn pause_handler(State(ctx): State<ApiContext>) -> CommandResult {
    respond(ctx.session.pause(), "Focus paused")
}

/// Handle POST /focus/resume
pub async fn resume_handler(State(ctx): State<ApiContext>) -> CommandResult {
    respond(ctx.session.resume(), "Focus resumed")
}

/// Handle POST /focus/reset
pub async fn reset_handler(State(ctx): State<ApiContext>) -> CommandResult {
    respond(ctx.session.reset(), "Focus reset")
}

/// Handle POST /focus/add-five
pub async fn add_five_handler(State(ctx): State<ApiContext>) -> CommandResult {
    respond(ctx.session.add_five_minutes(), "Added five minutes")
}

/// Handle POST /focus/subtract-five
pub async fn subtract_five_handler(State(ctx): State<ApiContext>) -> CommandResult {
    respond(ctx.session.subtract_five_minutes(), "Subtracted five minutes")
}

/// Handle POST /audio/volume
pub async fn volume_handler(
    State(ctx): State<ApiContext>,
    Json(request): Json<VolumeRequest>,
) -> CommandResult {
    respond(ctx.session.set_volume(request.percent), "Volume set")
}

/// Handle POST /audio/mute
pub async fn mute_handler(
    State(ctx): State<ApiContext>,
    Json(request): Json<MuteRequest>,
) -> CommandResult {
    let message = if request.muted { "Audio muted" } else { "Audio unmuted" };
    respond(ctx.session.set_muted(request.muted), message)
}

/// Handle POST /audio/track - Select an ambient track from the catalog
pub async fn track_handler(
    State(ctx): State<ApiContext>,
    Json(request): Json<TrackRequest>,
) -> CommandResult {
    match ctx.session.set_selected_music(&request.track_id) {
        Err(SessionError::UnknownTrack(id)) => {
            warn!("Unknown track requested: {}", id);
            Err(StatusCode::BAD_REQUEST)
        }
        result => respond(result.map_err(|e| e.to_string()), "Track selected"),
    }
}

/// Handle POST /audio/music - Enable or disable ambient music
pub async fn music_enabled_handler(
    State(ctx): State<ApiContext>,
    Json(request): Json<MusicEnabledRequest>,
) -> CommandResult {
    let message = if request.enabled { "Music enabled" } else { "Music disabled" };
    respond(ctx.session.set_music_enabled(request.enabled), message)
}

/// Handle GET /status - Return current focus status
pub async fn status_handler(
    State(ctx): State<ApiContext>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let focus = match ctx.session.status() {
        Ok(focus) => focus,
        Err(e) => {
            error!("Failed to get focus status: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = ctx.session.get_last_action();

    Ok(Json(StatusResponse {
        focus,
        uptime: ctx.session.get_uptime(),
        port: ctx.port,
        host: ctx.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /music - List the ambient tracks
pub async fn music_options_handler(
    State(ctx): State<ApiContext>,
) -> Result<Json<MusicOptionsResponse>, StatusCode> {
    match ctx.session.status() {
        Ok(focus) => Ok(Json(MusicOptionsResponse {
            options: ctx.session.music_options().to_vec(),
            selected: focus.selected_music,
        })),
        Err(e) => {
            error!("Failed to get focus status: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
