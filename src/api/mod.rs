//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::FocusSession;
use handlers::*;

/// Shared handler state
#[derive(Clone)]
pub struct ApiContext {
    pub session: Arc<FocusSession>,
    pub host: String,
    pub port: u16,
}

/// Create the HTTP router with all endpoints
pub fn create_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/focus/open", post(open_handler))
        .route("/focus/close", post(close_handler))
        .route("/focus/toggle", post(toggle_handler))
        .route("/focus/pause", post(pause_handler))
        .route("/focus/resume", post(resume_handler))
        .route("/focus/reset", post(reset_handler))
        .route("/focus/add-five", post(add_five_handler))
        .route("/focus/subtract-five", post(subtract_five_handler))
        .route("/audio/volume", post(volume_handler))
        .route("/audio/mute", post(mute_handler))
        .route("/audio/track", post(track_handler))
        .route("/audio/music", post(music_enabled_handler))
        .route("/status", get(status_handler))
        .route("/music", get(music_options_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        clock::ManualClock,
        persistence::{MemoryStore, StateCodec},
        state::{audio_prefs::default_catalog, SessionOptions},
    };

    fn router() -> Router {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let codec = Arc::new(StateCodec::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            1500,
        ));
        let options = SessionOptions {
            catalog: default_catalog(Path::new("/music")),
            ..SessionOptions::default()
        };
        let session = Arc::new(FocusSession::restore(options, codec, clock));
        create_router(ApiContext {
            session,
            host: "127.0.0.1".to_string(),
            port: 20554,
        })
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn open_toggle_and_status() {
        let app = router();

        let (status, body) = call(&app, "POST", "/focus/open", Some(json!({ "duration_seconds": 600 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "idle");
        assert_eq!(body["focus"]["remaining_seconds"], 600);
        assert_eq!(body["focus"]["is_visible"], true);

        let (_, body) = call(&app, "POST", "/focus/toggle", None).await;
        assert_eq!(body["status"], "running");

        let (_, body) = call(&app, "POST", "/focus/toggle", None).await;
        assert_eq!(body["status"], "paused");

        let (status, body) = call(&app, "GET", "/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["focus"]["is_paused"], true);
        assert_eq!(body["last_action"], "pause");
    }

    #[tokio::test]
    async fn open_without_body_keeps_default() {
        let app = router();
        let (status, body) = call(&app, "POST", "/focus/open", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["focus"]["remaining_seconds"], 1500);
    }

    #[tokio::test]
    async fn open_rejects_malformed_body() {
        let app = router();
        let (status, _) = call(&app, "POST", "/focus/open", Some(json!({ "duration_seconds": "abc" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("POST")
            .uri("/focus/open")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "GET", "/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["focus"]["is_visible"], false);
    }

    #[tokio::test]
    async fn audio_endpoints() {
        let app = router();

        let (_, body) = call(&app, "POST", "/audio/volume", Some(json!({ "percent": 30 }))).await;
        assert_eq!(body["focus"]["volume"], 30);

        let (_, body) = call(&app, "POST", "/audio/mute", Some(json!({ "muted": true }))).await;
        assert_eq!(body["focus"]["is_muted"], true);
        assert_eq!(body["focus"]["volume"], 30);

        let (status, body) = call(&app, "POST", "/audio/track", Some(json!({ "track_id": "forest" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["focus"]["selected_music"], "forest");

        let (status, _) = call(&app, "POST", "/audio/track", Some(json!({ "track_id": "nope" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(&app, "POST", "/audio/music", Some(json!({ "enabled": false }))).await;
        assert_eq!(body["focus"]["music_enabled"], false);

        let (_, body) = call(&app, "GET", "/music", None).await;
        assert_eq!(body["options"].as_array().map(Vec::len), Some(5));
        assert_eq!(body["selected"], "forest");
    }

    #[tokio::test]
    async fn adjust_endpoints_clamp() {
        let app = router();
        call(&app, "POST", "/focus/open", Some(json!({ "duration_seconds": 7180 }))).await;
        let (_, body) = call(&app, "POST", "/focus/add-five", None).await;
        assert_eq!(body["focus"]["remaining_seconds"], 7200);

        call(&app, "POST", "/focus/open", Some(json!({ "duration_seconds": 300 }))).await;
        let (_, body) = call(&app, "POST", "/focus/subtract-five", None).await;
        assert_eq!(body["focus"]["remaining_seconds"], 300);
    }

    #[tokio::test]
    async fn close_hides_and_health_answers() {
        let app = router();
        call(&app, "POST", "/focus/open", None).await;
        call(&app, "POST", "/focus/toggle", None).await;
        let (_, body) = call(&app, "POST", "/focus/close", None).await;
        assert_eq!(body["focus"]["is_visible"], false);
        assert_eq!(body["focus"]["is_running"], false);

        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
