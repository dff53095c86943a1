//! Ambient audio
//!
//! Player backends and the controller that keeps playback in sync with the
//! focus timer.

pub mod player;
pub mod sync;

pub use player::{AudioError, CommandPlayer, MediaPlayer, NullPlayer};
pub use sync::{AudioDirective, AudioSync};
