//! External command helpers
//!
//! This module contains the functions that shell out to other programs:
//! probing for the audio player and sending desktop notifications.

pub mod system;

// Re-export main functions
pub use system::*;
