//! Audio sync background task

use tracing::info;

use crate::audio::AudioSync;

/// Background task that reconciles the media player on every directive change
pub async fn audio_sync_task(mut sync: AudioSync) {
    info!("Starting audio sync task");

    loop {
        sync.reconcile().await;
        if sync.changed().await.is_err() {
            break;
        }
    }

    sync.shutdown().await;
    info!("Audio sync task finished");
}
