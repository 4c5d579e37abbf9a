//! Durable save store
//!
//! Writes either land completely or leave the previous save readable. Reads
//! fall back from the primary slot to the backup and heal the primary when
//! the backup was used.

use std::sync::Arc;

use super::backend::{FileBackend, KeyValueBackend, Slot, StorageBackend};
use super::error::{ParseError, ReadError, WriteError};
use super::prefs::KeyValueStore;
use super::record::SaveRecord;
use crate::config::{BackendKind, SaveConfig};

/// Outcome of reading one slot
enum SlotRead {
    Valid(SaveRecord),
    Absent,
    Corrupt(ParseError),
    Failed(ReadError),
}

/// Atomic write-with-backup and read-with-fallback over a backend
#[derive(Clone)]
pub struct DurableStore {
    backend: Arc<dyn StorageBackend>,
    pretty: bool,
}

impl DurableStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            pretty: true,
        }
    }

    /// Filesystem store rooted at `root`
    pub fn filesystem(root: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Arc::new(FileBackend::new(root)))
    }

    /// Key-value store keeping the document under `key`
    pub fn key_value(prefs: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self::new(Arc::new(KeyValueBackend::new(prefs, key)))
    }

    /// Build the store the config asks for.
    ///
    /// The key-value backend needs the host's preference store; the
    /// filesystem backend ignores it.
    pub fn from_config(config: &SaveConfig, prefs: Option<Arc<dyn KeyValueStore>>) -> Self {
        let store = match (config.backend, prefs) {
            (BackendKind::KeyValue, Some(prefs)) => {
                Self::key_value(prefs, config.key_value_key.clone())
            }
            (BackendKind::KeyValue, None) => {
                log::warn!("Key-value backend requested without a preference store; using files");
                Self::filesystem(config.save_root())
            }
            (BackendKind::Filesystem, _) => Self::filesystem(config.save_root()),
        };
        store.with_pretty(config.pretty_json)
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Where the primary document lives, for logs
    pub fn location(&self) -> String {
        self.backend.describe(Slot::Primary)
    }

    /// Serialize and commit a record
    pub fn write(&self, record: &SaveRecord) -> Result<(), WriteError> {
        let json = record
            .to_json(self.pretty)
            .map_err(|e| WriteError::Serialize(e.to_string()))?;
        self.write_bytes(json.as_bytes())
    }

    /// Commit an already serialized document
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<(), WriteError> {
        self.backend.commit(bytes)?;
        log::info!("Game data saved to {}", self.location());
        Ok(())
    }

    /// Load the most recent valid record.
    ///
    /// `Ok(None)` means nothing usable is stored (first run, or only corrupt
    /// data). `Err` means storage itself could not be read and no slot
    /// produced a record.
    pub fn read(&self) -> Result<Option<SaveRecord>, ReadError> {
        let primary_error = match self.read_one(Slot::Primary) {
            SlotRead::Valid(record) => return Ok(Some(record)),
            SlotRead::Absent => None,
            SlotRead::Corrupt(e) => {
                log::warn!("{}", e);
                None
            }
            SlotRead::Failed(e) => {
                log::warn!("{}", e);
                Some(e)
            }
        };

        match self.read_one(Slot::Backup) {
            SlotRead::Valid(record) => {
                log::warn!("Primary save file was unavailable; loaded from backup.");
                self.heal_primary();
                Ok(Some(record))
            }
            SlotRead::Absent => primary_error.map_or(Ok(None), Err),
            SlotRead::Corrupt(e) => {
                log::warn!("{}", e);
                primary_error.map_or(Ok(None), Err)
            }
            SlotRead::Failed(e) => Err(primary_error.unwrap_or(e)),
        }
    }

    fn read_one(&self, slot: Slot) -> SlotRead {
        let bytes = match self.backend.read_slot(slot) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return SlotRead::Absent,
            Err(e) => return SlotRead::Failed(e),
        };

        match SaveRecord::from_bytes(&bytes, &self.backend.describe(slot)) {
            Ok(record) => {
                log::info!("Game data loaded from {}", self.backend.describe(slot));
                SlotRead::Valid(record)
            }
            Err(e) => SlotRead::Corrupt(e),
        }
    }

    fn heal_primary(&self) {
        if let Err(e) = self.backend.restore_backup() {
            log::warn!("Could not restore primary save from backup: {}", e);
        }
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("location", &self.location())
            .field("pretty", &self.pretty)
            .finish()
    }
}
