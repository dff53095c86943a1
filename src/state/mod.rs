//! State management module
//!
//! This module contains the countdown state machine, audio preferences and the
//! focus session that ties them to persistence and audio.

pub mod app_state;
pub mod audio_prefs;
pub mod timer_state;

// Re-export main types
pub use app_state::{FocusEvent, FocusSession, FocusStatus, SessionError, SessionOptions};
pub use audio_prefs::{AudioPreferences, MusicTrack};
pub use timer_state::{DurationBounds, TickOutcome, TimerPhase, TimerState};
