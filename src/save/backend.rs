//! Storage backends
//!
//! The filesystem backend commits through a temp file, a backup copy and a
//! rename. The key-value backend keeps one logical slot for runtimes that
//! cannot open arbitrary paths.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{ReadError, WriteError, WriteStage};
use super::prefs::KeyValueStore;

/// Primary save file name under the storage root
pub const SAVE_FILE_NAME: &str = "savedata.json";
/// Staging file for writes in progress
pub const TEMP_FILE_NAME: &str = "savedata.json.tmp";
/// Copy of the previous primary
pub const BACKUP_FILE_NAME: &str = "savedata.json.bak";
/// Default entry name for the key-value backend
pub const DEFAULT_KEY_VALUE_KEY: &str = "SaveManager_SaveData";

/// Readable locations a backend may hold a document in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Primary,
    Backup,
}

/// Capability interface over where save bytes live
pub trait StorageBackend: Send + Sync {
    /// Human-readable location of a slot, used in logs and errors
    fn describe(&self, slot: Slot) -> String;

    /// Raw bytes of a slot, `None` when nothing is stored there
    fn read_slot(&self, slot: Slot) -> Result<Option<Vec<u8>>, ReadError>;

    /// Replace the primary document. On failure the previous one stays
    /// readable, either in place or from the backup slot.
    fn commit(&self, bytes: &[u8]) -> Result<(), WriteError>;

    /// Copy the backup over the primary
    fn restore_backup(&self) -> Result<(), WriteError>;
}

// ============================================================================
// Filesystem
// ============================================================================

/// Temp-file + backup + rename protocol under a root directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
    primary: PathBuf,
    temp: PathBuf,
    backup: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            primary: root.join(SAVE_FILE_NAME),
            temp: root.join(TEMP_FILE_NAME),
            backup: root.join(BACKUP_FILE_NAME),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    fn path_for(&self, slot: Slot) -> &Path {
        match slot {
            Slot::Primary => &self.primary,
            Slot::Backup => &self.backup,
        }
    }

    fn write_temp(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(&self.temp)?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    fn commit_steps(&self, bytes: &[u8]) -> Result<(), WriteError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| WriteError::io(WriteStage::CreateDir, self.root.display(), e))?;

        self.write_temp(bytes)
            .map_err(|e| WriteError::io(WriteStage::TempWrite, self.temp.display(), e))?;

        if self.primary.exists() {
            fs::copy(&self.primary, &self.backup)
                .map_err(|e| WriteError::io(WriteStage::BackupCopy, self.backup.display(), e))?;

            fs::remove_file(&self.primary).map_err(|e| {
                WriteError::io(WriteStage::RemovePrimary, self.primary.display(), e)
            })?;
        }

        fs::rename(&self.temp, &self.primary)
            .map_err(|e| WriteError::io(WriteStage::Promote, self.primary.display(), e))
    }

    fn discard_temp(&self) {
        if !self.temp.exists() {
            return;
        }
        if let Err(e) = fs::remove_file(&self.temp) {
            log::warn!("Unable to clean up temporary save file {:?}: {}", self.temp, e);
        }
    }
}

impl StorageBackend for FileBackend {
    fn describe(&self, slot: Slot) -> String {
        self.path_for(slot).display().to_string()
    }

    fn read_slot(&self, slot: Slot) -> Result<Option<Vec<u8>>, ReadError> {
        let path = self.path_for(slot);
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ReadError::io(path.display(), e)),
        }
    }

    fn commit(&self, bytes: &[u8]) -> Result<(), WriteError> {
        let result = self.commit_steps(bytes);
        if result.is_err() {
            self.discard_temp();
        }
        result
    }

    fn restore_backup(&self) -> Result<(), WriteError> {
        fs::copy(&self.backup, &self.primary)
            .map(|_| ())
            .map_err(|e| WriteError::io(WriteStage::Promote, self.primary.display(), e))
    }
}

// ============================================================================
// Key-value
// ============================================================================

/// Single named entry in a key-value store. There is no backup slot; the
/// host store provides its own durability.
#[derive(Clone)]
pub struct KeyValueBackend {
    prefs: Arc<dyn KeyValueStore>,
    key: String,
}

impl KeyValueBackend {
    pub fn new(prefs: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            prefs,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for KeyValueBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueBackend").field("key", &self.key).finish()
    }
}

impl StorageBackend for KeyValueBackend {
    fn describe(&self, slot: Slot) -> String {
        match slot {
            Slot::Primary => format!("key '{}'", self.key),
            Slot::Backup => format!("key '{}' (no backup)", self.key),
        }
    }

    fn read_slot(&self, slot: Slot) -> Result<Option<Vec<u8>>, ReadError> {
        if slot == Slot::Backup {
            return Ok(None);
        }
        self.prefs
            .get_string(&self.key)
            .map(|value| value.map(String::into_bytes))
            .map_err(|e| ReadError::io(self.describe(slot), e))
    }

    fn commit(&self, bytes: &[u8]) -> Result<(), WriteError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| WriteError::Serialize(format!("document is not UTF-8: {}", e)))?;
        let target = self.describe(Slot::Primary);
        self.prefs
            .set_string(&self.key, text)
            .map_err(|e| WriteError::io(WriteStage::KeyValue, &target, e))?;
        self.prefs
            .save()
            .map_err(|e| WriteError::io(WriteStage::KeyValue, &target, e))
    }

    fn restore_backup(&self) -> Result<(), WriteError> {
        Ok(())
    }
}
