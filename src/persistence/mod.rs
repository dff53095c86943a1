//! Persistence module
//!
//! Durable key-value stores and the codec that maps the timer onto them.

pub mod codec;
pub mod store;

pub use codec::{PersistedTimer, StateCodec};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
