//! Focus Timer - A state-managed HTTP server for a focus timer with ambient audio
//!
//! This is the main entry point for the focus-timer application.

use std::sync::Arc;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use focus_timer::{
    api::{create_router, ApiContext},
    audio::{AudioSync, CommandPlayer, MediaPlayer, NullPlayer},
    clock::{Clock, SystemClock},
    config::Config,
    persistence::{FileStore, KeyValueStore, MemoryStore, StateCodec},
    services::check_command_available,
    state::FocusSession,
    tasks::{audio_sync_task, completion_notifier_task, countdown_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("focus_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting focus-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, duration={}min, window={}-{}min",
          config.host, config.port, config.duration, config.min_minutes, config.max_minutes);

    let store: Arc<dyn KeyValueStore> = if config.ephemeral {
        info!("Ephemeral mode, timer state kept in memory");
        Arc::new(MemoryStore::new())
    } else {
        let store = FileStore::open(&config.state_dir).with_context(|| {
            format!("Failed to open state directory {}", config.state_dir.display())
        })?;
        info!("Persisting timer state in {}", store.dir().display());
        Arc::new(store)
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let options = config.session_options();
    let codec = Arc::new(
        StateCodec::new(store, Arc::clone(&clock), options.default_duration_seconds)
            .with_max_duration_seconds(options.bounds.max_seconds),
    );

    // Recover whatever the previous run left behind
    let session = Arc::new(FocusSession::restore(options, Arc::clone(&codec), clock));

    let player: Box<dyn MediaPlayer> = if config.no_audio {
        info!("Ambient audio disabled");
        Box::new(NullPlayer::new())
    } else if let Err(e) = check_command_available(&config.player).await {
        warn!("{}, continuing without ambient audio", e);
        Box::new(NullPlayer::new())
    } else {
        Box::new(CommandPlayer::new(config.player.clone()))
    };

    let audio = AudioSync::new(
        player,
        codec,
        session.music_options().to_vec(),
        session.audio_directives(),
        session.playback_indicator(),
    );

    // Start the background tasks
    tokio::spawn(audio_sync_task(audio));
    tokio::spawn(countdown_task(Arc::clone(&session)));
    tokio::spawn(completion_notifier_task(Arc::clone(&session), config.notify_command.clone()));

    // Create HTTP router with all endpoints
    let app = create_router(ApiContext {
        session: Arc::clone(&session),
        host: config.host.clone(),
        port: config.port,
    });

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /focus/open          - Show the timer (optional duration_seconds)");
    info!("  POST /focus/close         - Hide, reset and cancel the timer");
    info!("  POST /focus/toggle        - Start, pause or resume");
    info!("  POST /focus/pause|resume|reset");
    info!("  POST /focus/add-five|subtract-five");
    info!("  POST /audio/volume|mute|track|music");
    info!("  GET  /status              - Current timer and audio state");
    info!("  GET  /music               - Ambient track catalog");
    info!("  GET  /health              - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Leave a fresh snapshot for the next start
    if let Err(e) = session.persist_now() {
        warn!("Failed to persist timer on shutdown: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}
