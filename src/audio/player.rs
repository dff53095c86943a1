//! Media player backends for ambient audio

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::state::MusicTrack;

/// Media fault. The sync controller degrades these to "not playing".
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no track loaded")]
    NoSource,
    #[error("track source not found: {0}")]
    MissingSource(PathBuf),
    #[error("playback rejected: {0}")]
    Rejected(String),
}

/// A single playback handle
pub trait MediaPlayer: Send {
    /// Swap the source. Never starts playback. On failure the previous
    /// source is gone too.
    fn load(&mut self, track: &MusicTrack) -> Result<(), AudioError>;

    /// Start playback; resolves once playback has started or failed
    fn play(&mut self) -> BoxFuture<'_, Result<(), AudioError>>;

    fn pause(&mut self) -> BoxFuture<'_, ()>;

    /// Apply a volume in `[0.0, 1.0]`
    fn set_volume(&mut self, volume: f32) -> BoxFuture<'_, Result<(), AudioError>>;

    fn is_playing(&mut self) -> bool;
}

/// Plays tracks by spawning an mpv-compatible command line player.
/// Pausing stops the process; playing again restarts the loop.
#[derive(Debug)]
pub struct CommandPlayer {
    program: String,
    source: Option<PathBuf>,
    volume: f32,
    child: Option<Child>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            source: None,
            volume: 0.5,
            child: None,
        }
    }

    fn args(&self, source: &Path) -> Vec<String> {
        vec![
            "--no-video".to_string(),
            "--really-quiet".to_string(),
            "--loop-file=inf".to_string(),
            format!("--volume={}", (self.volume * 100.0).round() as u32),
            source.display().to_string(),
        ]
    }

    async fn spawn(&mut self) -> Result<(), AudioError> {
        if self.is_playing() {
            return Ok(());
        }
        let source = self.source.clone().ok_or(AudioError::NoSource)?;

        let child = Command::new(&self.program)
            .args(self.args(&source))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AudioError::Rejected(format!("failed to spawn {}: {}", self.program, e)))?;

        debug!("Started {} for {}", self.program, source.display());
        self.child = Some(child);
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                warn!("Failed to stop {}: {}", self.program, e);
            }
        }
    }
}

impl MediaPlayer for CommandPlayer {
    fn load(&mut self, track: &MusicTrack) -> Result<(), AudioError> {
        self.source = None;
        if !track.source.exists() {
            return Err(AudioError::MissingSource(track.source.clone()));
        }
        self.source = Some(track.source.clone());
        info!("Loaded ambient track {}", track.id);
        Ok(())
    }

    fn play(&mut self) -> BoxFuture<'_, Result<(), AudioError>> {
        Box::pin(self.spawn())
    }

    fn pause(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(self.stop())
    }

    fn set_volume(&mut self, volume: f32) -> BoxFuture<'_, Result<(), AudioError>> {
        Box::pin(async move {
            let volume = volume.clamp(0.0, 1.0);
            if (volume - self.volume).abs() < f32::EPSILON {
                return Ok(());
            }
            self.volume = volume;

            // the volume is a spawn argument, so a live process is restarted
            if self.is_playing() {
                self.stop().await;
                self.spawn().await?;
            }
            Ok(())
        })
    }

    fn is_playing(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!("{} exited unexpectedly: {}", self.program, status);
                self.child = None;
                false
            }
            Err(e) => {
                warn!("Failed to poll {}: {}", self.program, e);
                self.child = None;
                false
            }
        }
    }
}

/// Silent player for runs without audio output
#[derive(Debug, Default)]
pub struct NullPlayer {
    loaded: Option<String>,
    playing: bool,
}

impl NullPlayer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MediaPlayer for NullPlayer {
    fn load(&mut self, track: &MusicTrack) -> Result<(), AudioError> {
        self.loaded = Some(track.id.clone());
        Ok(())
    }

    fn play(&mut self) -> BoxFuture<'_, Result<(), AudioError>> {
        Box::pin(async move {
            if self.loaded.is_none() {
                return Err(AudioError::NoSource);
            }
            self.playing = true;
            Ok(())
        })
    }

    fn pause(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.playing = false;
        })
    }

    fn set_volume(&mut self, _volume: f32) -> BoxFuture<'_, Result<(), AudioError>> {
        Box::pin(async { Ok(()) })
    }

    fn is_playing(&mut self) -> bool {
        self.playing
    }
}
