//! Completion notifier background task

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::{
    services::run_notify_command,
    state::{FocusEvent, FocusSession},
};

/// Background task that announces finished focus sessions
pub async fn completion_notifier_task(session: Arc<FocusSession>, notify_command: Option<String>) {
    info!("Starting completion notifier task");

    let mut events = session.subscribe_events();

    loop {
        match events.recv().await {
            Ok(FocusEvent::Completed) => {
                info!("Focus session finished");
                if let Some(program) = notify_command.as_deref() {
                    if let Err(e) = run_notify_command(program, "Focus session complete").await {
                        error!("Failed to send completion notification: {}", e);
                    }
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Completion notifier lagged, {} events skipped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
