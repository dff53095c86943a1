//! Focus session state management
//!
//! [`FocusSession`] is the imperative shell around the pure countdown in
//! [`super::timer_state`]. Every command mutates in-memory state first, then
//! persists it through the [`StateCodec`], then publishes a fresh status and
//! audio directive for the background tasks.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Instant,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::{
    audio_prefs::{AudioPreferences, MusicTrack},
    timer_state::{
        format_clock, DurationBounds, TickOutcome, TimerState, ADJUST_STEP_SECONDS,
        DEFAULT_DURATION_SECONDS,
    },
};
use crate::{audio::AudioDirective, clock::Clock, persistence::StateCodec};

/// Construction-time configuration of a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub default_duration_seconds: u64,
    pub bounds: DurationBounds,
    pub catalog: Vec<MusicTrack>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_duration_seconds: DEFAULT_DURATION_SECONDS,
            bounds: DurationBounds::default(),
            catalog: Vec::new(),
        }
    }
}

/// Failure of a session command that carries user input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown music track: {0}")]
    UnknownTrack(String),
    #[error("{0}")]
    Internal(String),
}

impl From<String> for SessionError {
    fn from(message: String) -> Self {
        Self::Internal(message)
    }
}

/// Broadcast to anyone interested in the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    Completed,
}

/// Read-only view handed to clients after every command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusStatus {
    pub is_visible: bool,
    pub is_playing: bool,
    pub remaining_seconds: u64,
    pub remaining_display: String,
    pub duration_seconds: u64,
    pub is_running: bool,
    pub is_paused: bool,
    pub volume: u8,
    pub is_muted: bool,
    pub selected_music: String,
    pub music_enabled: bool,
}

impl FocusStatus {
    /// Counting down right now
    pub fn is_ticking(&self) -> bool {
        self.is_running && !self.is_paused
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SessionFlags {
    visible: bool,
    user_started: bool,
    user_wants_music: bool,
}

/// The focus timer with its audio preferences and side effects
pub struct FocusSession {
    timer_state: Arc<Mutex<TimerState>>,
    audio_prefs: Arc<Mutex<AudioPreferences>>,
    session_flags: Arc<Mutex<SessionFlags>>,
    options: SessionOptions,
    codec: Arc<StateCodec>,
    clock: Arc<dyn Clock>,
    audio_playing: Arc<AtomicBool>,
    /// Server metadata
    start_time: Instant,
    last_action: Arc<Mutex<Option<(String, DateTime<Utc>)>>>,
    /// Completion broadcast
    event_tx: broadcast::Sender<FocusEvent>,
    status_tx: watch::Sender<FocusStatus>,
    _status_rx: watch::Receiver<FocusStatus>,
    audio_tx: watch::Sender<AudioDirective>,
    _audio_rx: watch::Receiver<AudioDirective>,
}

impl FocusSession {
    /// Build a session, recovering whatever the codec still holds
    pub fn restore(options: SessionOptions, codec: Arc<StateCodec>, clock: Arc<dyn Clock>) -> Self {
        let timer = match codec.load() {
            Some(timer) => {
                if timer.is_running() {
                    info!(
                        "Restored {} focus timer with {}s remaining",
                        if timer.is_paused() { "paused" } else { "running" },
                        timer.remaining_seconds
                    );
                }
                timer
            }
            None => TimerState::new(options.default_duration_seconds),
        };

        let first_track = options
            .catalog
            .first()
            .map(|t| t.id.clone())
            .unwrap_or_default();
        let prefs = AudioPreferences::new(first_track);
        let flags = SessionFlags {
            visible: timer.is_running(),
            ..SessionFlags::default()
        };

        let audio_playing = Arc::new(AtomicBool::new(false));
        let status = build_status(&timer, &prefs, &flags, false);
        let directive = build_directive(&timer, &prefs, &flags);
        let (event_tx, _) = broadcast::channel(16);
        let (status_tx, status_rx) = watch::channel(status);
        let (audio_tx, audio_rx) = watch::channel(directive);

        Self {
            timer_state: Arc::new(Mutex::new(timer)),
            audio_prefs: Arc::new(Mutex::new(prefs)),
            session_flags: Arc::new(Mutex::new(flags)),
            options,
            codec,
            clock,
            audio_playing,
            start_time: Instant::now(),
            last_action: Arc::new(Mutex::new(None)),
            event_tx,
            status_tx,
            _status_rx: status_rx,
            audio_tx,
            _audio_rx: audio_rx,
        }
    }

    fn lock_timer(&self) -> Result<MutexGuard<'_, TimerState>, String> {
        self.timer_state
            .lock()
            .map_err(|e| format!("Failed to lock timer state: {}", e))
    }

    fn lock_prefs(&self) -> Result<MutexGuard<'_, AudioPreferences>, String> {
        self.audio_prefs
            .lock()
            .map_err(|e| format!("Failed to lock audio preferences: {}", e))
    }

    fn lock_flags(&self) -> Result<MutexGuard<'_, SessionFlags>, String> {
        self.session_flags
            .lock()
            .map_err(|e| format!("Failed to lock session flags: {}", e))
    }

    /// Apply a timer transition. Returns the new timer if anything changed.
    fn transition<F>(&self, action: &str, updater: F) -> Result<Option<TimerState>, String>
    where
        F: FnOnce(&mut TimerState, &mut SessionFlags, i64) -> bool,
    {
        let now = self.clock.now_ms();
        let mut timer = self.lock_timer()?;
        let mut flags = self.lock_flags()?;

        if !updater(&mut *timer, &mut *flags, now) {
            debug!("{} ignored in current state", action);
            return Ok(None);
        }
        let snapshot = timer.clone();
        drop(flags);
        drop(timer);

        self.record_action(action);
        Ok(Some(snapshot))
    }

    fn update_prefs<F>(&self, action: &str, updater: F) -> Result<FocusStatus, String>
    where
        F: FnOnce(&mut AudioPreferences, &mut SessionFlags),
    {
        {
            let mut prefs = self.lock_prefs()?;
            let mut flags = self.lock_flags()?;
            updater(&mut *prefs, &mut *flags);
        }
        self.record_action(action);
        self.publish()
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last) = self.last_action.lock() {
            *last = Some((action.to_string(), Utc::now()));
        }
    }

    /// Push the current status and audio directive to subscribers
    fn publish(&self) -> Result<FocusStatus, String> {
        let (status, directive) = {
            let timer = self.lock_timer()?;
            let prefs = self.lock_prefs()?;
            let flags = self.lock_flags()?;
            (
                build_status(&timer, &prefs, &flags, self.audio_playing.load(Ordering::SeqCst)),
                build_directive(&timer, &prefs, &flags),
            )
        };

        self.status_tx.send_replace(status.clone());
        self.audio_tx.send_if_modified(|current| {
            if *current == directive {
                return false;
            }
            *current = directive;
            true
        });
        Ok(status)
    }

    /// Show the timer. Sets the duration when idle; a running timer is left alone.
    pub fn open_focus(&self, duration_seconds: Option<u64>) -> Result<FocusStatus, String> {
        // a new session never inherits an earlier cancellation
        self.codec.clear_flags();

        let bounds = self.options.bounds;
        if let Some(timer) = self.transition("open", |timer, flags, _| {
            flags.visible = true;
            if let (true, Some(duration)) = (timer.is_idle(), duration_seconds) {
                let duration = bounds.clamp(duration);
                timer.duration_seconds = duration;
                timer.remaining_seconds = duration;
            }
            true
        })? {
            self.codec.save_now(&timer);
            info!("Focus opened ({})", format_clock(timer.remaining_seconds));
        }
        self.publish()
    }

    /// Hide the timer, reset it to defaults and cancel timer and audio durably
    pub fn close_focus(&self) -> Result<FocusStatus, String> {
        let default_duration = self.options.default_duration_seconds;
        self.transition("close", |timer, flags, _| {
            *timer = TimerState::new(default_duration);
            *flags = SessionFlags::default();
            true
        })?;
        self.codec.clear();
        info!("Focus closed");
        self.publish()
    }

    /// Start when idle, pause when running, resume when paused
    pub fn toggle_play(&self) -> Result<FocusStatus, String> {
        let timer = self.get_timer_state()?;
        if timer.is_idle() {
            self.start()
        } else if timer.is_paused() {
            self.resume()
        } else {
            self.pause()
        }
    }

    pub fn start(&self) -> Result<FocusStatus, String> {
        if let Some(timer) = self.transition("start", |timer, flags, now| {
            let started = timer.start(now);
            if started {
                flags.visible = true;
                flags.user_started = true;
            }
            started
        })? {
            self.codec.clear_flags();
            self.codec.save_now(&timer);
            info!("Focus timer started with {}s", timer.remaining_seconds);
        }
        self.publish()
    }

    pub fn pause(&self) -> Result<FocusStatus, String> {
        if let Some(timer) = self.transition("pause", |timer, _, now| timer.pause(now))? {
            self.codec.save_now(&timer);
            info!("Focus timer paused at {}s", timer.remaining_seconds);
        }
        self.publish()
    }

    pub fn resume(&self) -> Result<FocusStatus, String> {
        if let Some(timer) = self.transition("resume", |timer, flags, now| {
            let resumed = timer.resume(now);
            if resumed {
                flags.user_started = true;
            }
            resumed
        })? {
            self.codec.save_now(&timer);
            info!(
                "Focus timer resumed ({}ms paused so far)",
                timer.paused_total_ms()
            );
        }
        self.publish()
    }

    /// Back to idle with the configured duration; the stored record is dropped
    pub fn reset(&self) -> Result<FocusStatus, String> {
        self.transition("reset", |timer, flags, _| {
            timer.reset();
            flags.user_started = false;
            true
        })?;
        self.codec.remove();
        info!("Focus timer reset");
        self.publish()
    }

    pub fn add_five_minutes(&self) -> Result<FocusStatus, String> {
        self.adjust_duration("add-five", ADJUST_STEP_SECONDS)
    }

    pub fn subtract_five_minutes(&self) -> Result<FocusStatus, String> {
        self.adjust_duration("subtract-five", -ADJUST_STEP_SECONDS)
    }

    fn adjust_duration(&self, action: &str, delta_seconds: i64) -> Result<FocusStatus, String> {
        let bounds = self.options.bounds;
        if let Some(timer) =
            self.transition(action, |timer, _, _| timer.adjust(delta_seconds, bounds))?
        {
            self.codec.save_now(&timer);
            debug!("Duration adjusted to {}s", timer.duration_seconds);
        }
        self.publish()
    }

    /// Advance the countdown from the wall clock. Called once per second while running.
    pub fn tick(&self) -> Result<TickOutcome, String> {
        let (outcome, snapshot) = {
            let mut timer = self.lock_timer()?;
            let outcome = timer.tick(self.clock.now_ms());
            (outcome, timer.clone())
        };

        match outcome {
            TickOutcome::Unchanged => return Ok(outcome),
            TickOutcome::Ticked => {
                self.codec.save(&snapshot);
            }
            TickOutcome::Completed => {
                self.codec.save_now(&snapshot);
                self.record_action("complete");
                info!("Focus timer completed");
                if self.event_tx.send(FocusEvent::Completed).is_err() {
                    debug!("No listeners for completion event");
                }
            }
        }

        self.publish()?;
        Ok(outcome)
    }

    pub fn set_volume(&self, percent: u32) -> Result<FocusStatus, String> {
        self.update_prefs("volume", |prefs, _| prefs.set_volume(percent))
    }

    pub fn set_muted(&self, muted: bool) -> Result<FocusStatus, String> {
        self.update_prefs(if muted { "mute" } else { "unmute" }, |prefs, _| {
            prefs.is_muted = muted
        })
    }

    pub fn set_selected_music(&self, track_id: &str) -> Result<FocusStatus, SessionError> {
        if !self.options.catalog.iter().any(|t| t.id == track_id) {
            warn!("Rejected unknown music track: {}", track_id);
            return Err(SessionError::UnknownTrack(track_id.to_string()));
        }
        let status = self.update_prefs("select-music", |prefs, flags| {
            prefs.selected_track_id = track_id.to_string();
            flags.user_wants_music = true;
        })?;
        Ok(status)
    }

    pub fn set_music_enabled(&self, enabled: bool) -> Result<FocusStatus, String> {
        self.update_prefs(
            if enabled { "music-on" } else { "music-off" },
            |prefs, flags| {
                prefs.music_enabled = enabled;
                flags.user_wants_music = enabled;
            },
        )
    }

    /// Current status snapshot
    pub fn status(&self) -> Result<FocusStatus, String> {
        let timer = self.lock_timer()?;
        let prefs = self.lock_prefs()?;
        let flags = self.lock_flags()?;
        Ok(build_status(
            &timer,
            &prefs,
            &flags,
            self.audio_playing.load(Ordering::SeqCst),
        ))
    }

    pub fn get_timer_state(&self) -> Result<TimerState, String> {
        self.lock_timer().map(|timer| timer.clone())
    }

    pub fn music_options(&self) -> &[MusicTrack] {
        &self.options.catalog
    }

    /// Write the current timer unthrottled, e.g. right before shutdown
    pub fn persist_now(&self) -> Result<(), String> {
        let timer = self.get_timer_state()?;
        if !self.codec.is_timer_cancelled() {
            self.codec.save_now(&timer);
        }
        Ok(())
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FocusEvent> {
        self.event_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<FocusStatus> {
        self.status_tx.subscribe()
    }

    pub fn audio_directives(&self) -> watch::Receiver<AudioDirective> {
        self.audio_tx.subscribe()
    }

    /// Flag the audio controller flips as playback actually starts and stops
    pub fn playback_indicator(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.audio_playing)
    }

    pub fn codec(&self) -> Arc<StateCodec> {
        Arc::clone(&self.codec)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self.last_action.lock().ok().and_then(|a| a.clone()) {
            Some((action, at)) => (Some(action), Some(at)),
            None => (None, None),
        }
    }
}

fn build_status(
    timer: &TimerState,
    prefs: &AudioPreferences,
    flags: &SessionFlags,
    is_playing: bool,
) -> FocusStatus {
    FocusStatus {
        is_visible: flags.visible,
        is_playing,
        remaining_seconds: timer.remaining_seconds,
        remaining_display: format_clock(timer.remaining_seconds),
        duration_seconds: timer.duration_seconds,
        is_running: timer.is_running(),
        is_paused: timer.is_paused(),
        volume: prefs.volume_percent,
        is_muted: prefs.is_muted,
        selected_music: prefs.selected_track_id.clone(),
        music_enabled: prefs.music_enabled,
    }
}

fn build_directive(
    timer: &TimerState,
    prefs: &AudioPreferences,
    flags: &SessionFlags,
) -> AudioDirective {
    AudioDirective {
        timer_active: timer.is_ticking(),
        music_enabled: prefs.music_enabled,
        user_started: flags.user_started,
        user_wants_music: flags.user_wants_music,
        volume_percent: prefs.volume_percent,
        is_muted: prefs.is_muted,
        track_id: prefs.selected_track_id.clone(),
    }
}
