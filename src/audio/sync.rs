//! Audio sync controller
//!
//! Keeps the single [`MediaPlayer`] in line with the latest [`AudioDirective`]
//! published by the focus session. The durable cancellation flags are checked
//! before every play attempt and again once the attempt resolves.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::player::MediaPlayer;
use crate::{
    persistence::StateCodec,
    state::{audio_prefs::effective_volume, MusicTrack},
};

/// Everything the audio side needs to know about the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDirective {
    /// Counting down (running and not paused)
    pub timer_active: bool,
    pub music_enabled: bool,
    /// Start or resume was issued by the user in this process
    pub user_started: bool,
    /// The user explicitly asked for music in this process
    pub user_wants_music: bool,
    pub volume_percent: u8,
    pub is_muted: bool,
    pub track_id: String,
}

impl AudioDirective {
    pub fn should_play(&self) -> bool {
        self.timer_active && self.music_enabled && (self.user_started || self.user_wants_music)
    }

    pub fn effective_volume(&self) -> f32 {
        effective_volume(self.volume_percent, self.is_muted)
    }
}

/// Owner of the one media player
pub struct AudioSync {
    player: Box<dyn MediaPlayer>,
    codec: Arc<StateCodec>,
    catalog: Vec<MusicTrack>,
    directives: watch::Receiver<AudioDirective>,
    playing: Arc<AtomicBool>,
    loaded_track: Option<String>,
    /// Whether the player holds the source of `loaded_track`
    track_ready: bool,
    applied_volume: Option<f32>,
}

impl AudioSync {
    pub fn new(
        player: Box<dyn MediaPlayer>,
        codec: Arc<StateCodec>,
        catalog: Vec<MusicTrack>,
        directives: watch::Receiver<AudioDirective>,
        playing: Arc<AtomicBool>,
    ) -> Self {
        Self {
            player,
            codec,
            catalog,
            directives,
            playing,
            loaded_track: None,
            track_ready: false,
            applied_volume: None,
        }
    }

    /// Wait for the next directive. Errors once the session is gone.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.directives.changed().await
    }

    fn latest(&self) -> AudioDirective {
        self.directives.borrow().clone()
    }

    fn cancelled(&self) -> bool {
        self.codec.is_audio_cancelled() || self.codec.is_timer_cancelled()
    }

    fn publish_playing(&mut self) {
        let playing = self.player.is_playing();
        self.playing.store(playing, Ordering::SeqCst);
    }

    /// Bring the player in line with the latest directive
    pub async fn reconcile(&mut self) {
        let directive = self.directives.borrow_and_update().clone();

        self.apply_volume(&directive).await;

        if self.loaded_track.as_deref() != Some(directive.track_id.as_str()) {
            self.swap_track(&directive.track_id).await;
        }

        if directive.should_play() && self.track_ready && !self.cancelled() {
            if !self.player.is_playing() {
                self.attempt_play().await;
            }
        } else if self.player.is_playing() {
            debug!("Pausing ambient audio");
            self.player.pause().await;
        }

        self.publish_playing();
    }

    async fn apply_volume(&mut self, directive: &AudioDirective) {
        let volume = directive.effective_volume();
        if self.applied_volume == Some(volume) {
            return;
        }
        match self.player.set_volume(volume).await {
            Ok(()) => self.applied_volume = Some(volume),
            Err(e) => warn!("Failed to apply volume {:.2}: {}", volume, e),
        }
    }

    async fn swap_track(&mut self, track_id: &str) {
        let Some(track) = self.catalog.iter().find(|t| t.id == track_id).cloned() else {
            warn!("Unknown ambient track: {}", track_id);
            return;
        };

        let was_playing = self.player.is_playing();
        if was_playing {
            self.player.pause().await;
        }

        // a failed load is not retried until the selection changes, and
        // nothing plays until some load succeeds
        self.loaded_track = Some(track.id.clone());
        self.track_ready = false;
        if let Err(e) = self.player.load(&track) {
            warn!("Failed to load ambient track {}: {}", track.id, e);
            return;
        }
        self.track_ready = true;

        if was_playing && self.latest().should_play() {
            self.attempt_play().await;
        }
    }

    async fn attempt_play(&mut self) {
        if self.cancelled() {
            debug!("Audio cancelled, not starting playback");
            if self.player.is_playing() {
                self.player.pause().await;
            }
            return;
        }

        if let Err(e) = self.player.play().await {
            warn!("Ambient audio did not start: {}", e);
            return;
        }

        // re-check: the session may have moved on while playback was starting
        if self.cancelled() || !self.latest().should_play() {
            info!("Audio cancelled while starting, pausing");
            self.player.pause().await;
        }
    }

    /// Stop playback for good
    pub async fn shutdown(&mut self) {
        if self.player.is_playing() {
            self.player.pause().await;
        }
        self.playing.store(false, Ordering::SeqCst);
    }
}
