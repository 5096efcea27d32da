//! The storage side of the adapter boundary: everything the log manager
//! needs from a page store, and nothing else.

pub mod engine;

pub use engine::{InMemoryStorageEngine, StorageEngine};
