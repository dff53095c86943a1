//! Countdown background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::state::{FocusSession, TickOutcome};

/// Background task that ticks the focus timer once per second while it runs
pub async fn countdown_task(session: Arc<FocusSession>) {
    info!("Starting countdown task");

    let mut status_rx = session.subscribe_status();

    loop {
        // Idle or paused: wait for the next status change
        if !status_rx.borrow_and_update().is_ticking() {
            if status_rx.changed().await.is_err() {
                break;
            }
            continue;
        }

        debug!("Timer running, ticking every second");
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match session.tick() {
                        Ok(TickOutcome::Completed) => {
                            debug!("Countdown finished, stopping ticks");
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => error!("Failed to tick focus timer: {}", e),
                    }
                }

                changed = status_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if !status_rx.borrow_and_update().is_ticking() {
                        debug!("Timer stopped ticking");
                        break;
                    }
                }
            }
        }
    }

    info!("Countdown task finished");
}
