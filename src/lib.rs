//! Focus Timer - A state-managed HTTP server for a drift-corrected focus timer
//!
//! This library provides the countdown state machine, its durable persistence
//! with wall-clock recovery, and the ambient audio controller that follows the
//! timer's running state.

pub mod api;
pub mod audio;
pub mod clock;
pub mod config;
pub mod persistence;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::{create_router, ApiContext};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use state::{FocusEvent, FocusSession, FocusStatus};
pub use utils::signals::shutdown_signal;
