//! Ambient audio preferences and the music catalog

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A selectable ambient track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicTrack {
    pub id: String,
    pub name: String,
    pub source: PathBuf,
}

impl MusicTrack {
    pub fn new(id: &str, name: &str, source: PathBuf) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            source,
        }
    }
}

/// Built-in ambient loops, resolved against `music_dir`
pub fn default_catalog(music_dir: &Path) -> Vec<MusicTrack> {
    [
        ("rain", "Gentle Rain", "rain.mp3"),
        ("forest", "Forest Morning", "forest.mp3"),
        ("ocean", "Ocean Waves", "ocean.mp3"),
        ("cafe", "Coffee Shop", "cafe.mp3"),
        ("lofi", "Lo-fi Beats", "lofi.mp3"),
    ]
    .into_iter()
    .map(|(id, name, file)| MusicTrack::new(id, name, music_dir.join(file)))
    .collect()
}

/// User-controlled audio settings. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPreferences {
    pub volume_percent: u8,
    pub is_muted: bool,
    pub selected_track_id: String,
    pub music_enabled: bool,
}

impl AudioPreferences {
    pub fn new(selected_track_id: String) -> Self {
        Self {
            volume_percent: 50,
            is_muted: false,
            selected_track_id,
            music_enabled: true,
        }
    }

    pub fn set_volume(&mut self, percent: u32) {
        self.volume_percent = percent.min(100) as u8;
    }

    pub fn effective_volume(&self) -> f32 {
        effective_volume(self.volume_percent, self.is_muted)
    }
}

/// Player volume in `[0.0, 1.0]`; muting yields zero without losing the percent
pub fn effective_volume(volume_percent: u8, is_muted: bool) -> f32 {
    if is_muted {
        0.0
    } else {
        f32::from(volume_percent.min(100)) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mute_keeps_stored_volume() {
        let mut prefs = AudioPreferences::new("rain".to_string());
        prefs.set_volume(80);
        prefs.is_muted = true;
        assert_eq!(prefs.effective_volume(), 0.0);
        assert_eq!(prefs.volume_percent, 80);
        prefs.is_muted = false;
        assert_eq!(prefs.effective_volume(), 0.8);
    }

    #[test]
    fn volume_is_capped() {
        let mut prefs = AudioPreferences::new("rain".to_string());
        prefs.set_volume(250);
        assert_eq!(prefs.volume_percent, 100);
        assert_eq!(effective_volume(100, false), 1.0);
    }

    #[test]
    fn catalog_resolves_sources() {
        let catalog = default_catalog(Path::new("/srv/music"));
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog[0].id, "rain");
        assert_eq!(catalog[0].source, PathBuf::from("/srv/music/rain.mp3"));
    }
}
