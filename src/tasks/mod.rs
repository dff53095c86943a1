//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod audio_sync;
pub mod completion;
pub mod countdown;

// Re-export main functions
pub use audio_sync::audio_sync_task;
pub use completion::completion_notifier_task;
pub use countdown::countdown_task;
