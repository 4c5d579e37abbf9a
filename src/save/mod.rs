//! Save/load system
//!
//! Durable storage of player progress and the coordinator that schedules
//! writes to it.

pub mod autosave;
pub mod backend;
pub mod coordinator;
pub mod error;
pub mod hooks;
pub mod ledger;
pub mod prefs;
pub mod record;
pub mod store;

pub use autosave::AutosaveTimer;
pub use backend::{
    FileBackend, KeyValueBackend, Slot, StorageBackend,
    BACKUP_FILE_NAME, DEFAULT_KEY_VALUE_KEY, SAVE_FILE_NAME, TEMP_FILE_NAME,
};
pub use coordinator::{LoadReport, LoadSource, SaveCoordinator, SaveStats, WritePhase};
pub use error::{KeyValueError, ParseError, ReadError, WriteError, WriteStage};
pub use hooks::{CollectibleWorld, EmptyWorld, PlayerSnapshotSource};
pub use ledger::{CollectibleLedger, LegacyFlagSource};
pub use prefs::{FilePrefs, KeyValueStore, LegacyPrefsFlags, MemoryPrefs, PrefValue};
pub use record::{ResourceCounters, SaveRecord, Vec3, DEFAULT_PLAYER_NAME};
pub use store::DurableStore;
