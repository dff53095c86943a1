//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

use crate::state::{audio_prefs::default_catalog, DurationBounds, SessionOptions};

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "focus-timer")]
#[command(about = "A state-managed HTTP server for a focus timer with ambient audio")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Default focus duration in minutes
    #[arg(short, long, default_value = "25")]
    pub duration: u64,

    /// Shortest allowed duration in minutes
    #[arg(long, default_value = "5")]
    pub min_minutes: u64,

    /// Longest allowed duration in minutes
    #[arg(long, default_value = "120")]
    pub max_minutes: u64,

    /// Directory holding the persisted timer state
    #[arg(long, default_value = ".focus-timer")]
    pub state_dir: PathBuf,

    /// Keep state in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// Directory containing the ambient tracks
    #[arg(long, default_value = "music")]
    pub music_dir: PathBuf,

    /// mpv-compatible player used for ambient audio
    #[arg(long, default_value = "mpv")]
    pub player: String,

    /// Disable ambient audio output
    #[arg(long)]
    pub no_audio: bool,

    /// Command run with a message argument when a session completes
    #[arg(long)]
    pub notify_command: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn bounds(&self) -> DurationBounds {
        DurationBounds::from_minutes(self.min_minutes, self.max_minutes)
    }

    /// Default duration in seconds, kept inside the allowed window
    pub fn default_duration_seconds(&self) -> u64 {
        self.bounds().clamp(self.duration * 60)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            default_duration_seconds: self.default_duration_seconds(),
            bounds: self.bounds(),
            catalog: default_catalog(&self.music_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_pomodoro() {
        let config = Config::try_parse_from(["focus-timer"]).unwrap();
        assert_eq!(config.default_duration_seconds(), 1500);
        assert_eq!(config.bounds(), DurationBounds::from_minutes(5, 120));
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn duration_is_clamped_to_window() {
        let config =
            Config::try_parse_from(["focus-timer", "--duration", "500", "--verbose"]).unwrap();
        assert_eq!(config.default_duration_seconds(), 7200);
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.session_options().catalog.len(), 5);
    }
}
