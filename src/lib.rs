//! Odyssey save - crash-safe persistence of player progress
//!
//! Keeps position, resources and unlocked collectibles on local storage,
//! surviving crashes, overlapping save requests and sandboxes without
//! filesystem access.

pub mod config;
pub mod save;

// Re-export commonly used types
pub use config::{BackendKind, SaveConfig};
pub use save::{
    CollectibleWorld, DurableStore, PlayerSnapshotSource, ReadError, SaveCoordinator,
    SaveRecord, WriteError,
};
