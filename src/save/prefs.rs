//! Key-value preference storage
//!
//! A small named-entry store for runtimes that cannot open arbitrary paths.
//! The save backend keeps its whole document under one key, and older builds
//! left per-item collectible flags here.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::KeyValueError;
use super::ledger::LegacyFlagSource;

/// Prefix of the per-item flags written by older builds
pub const LEGACY_FLAG_PREFIX: &str = "Collectible_";

/// A stored preference value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Int(i64),
    Str(String),
}

/// Named-entry storage with string and integer values
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<PrefValue>, KeyValueError>;
    fn set(&self, key: &str, value: PrefValue) -> Result<(), KeyValueError>;
    fn delete_key(&self, key: &str) -> Result<(), KeyValueError>;
    /// Make previous `set` calls durable
    fn save(&self) -> Result<(), KeyValueError>;

    fn get_string(&self, key: &str) -> Result<Option<String>, KeyValueError> {
        Ok(match self.get(key)? {
            Some(PrefValue::Str(s)) => Some(s),
            _ => None,
        })
    }

    fn get_int(&self, key: &str) -> Result<Option<i64>, KeyValueError> {
        Ok(match self.get(key)? {
            Some(PrefValue::Int(v)) => Some(v),
            _ => None,
        })
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), KeyValueError> {
        self.set(key, PrefValue::Str(value.to_string()))
    }

    fn set_int(&self, key: &str, value: i64) -> Result<(), KeyValueError> {
        self.set(key, PrefValue::Int(value))
    }
}

/// In-process preference store
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    entries: RwLock<HashMap<String, PrefValue>>,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryPrefs {
    fn get(&self, key: &str) -> Result<Option<PrefValue>, KeyValueError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: PrefValue) -> Result<(), KeyValueError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn delete_key(&self, key: &str) -> Result<(), KeyValueError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn save(&self) -> Result<(), KeyValueError> {
        Ok(())
    }
}

/// Preference store persisted as one JSON map file
#[derive(Debug)]
pub struct FilePrefs {
    path: PathBuf,
    entries: RwLock<HashMap<String, PrefValue>>,
}

impl FilePrefs {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, KeyValueError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => HashMap::new(),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| KeyValueError::Corrupt(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(KeyValueError::Io(format!("{}: {}", path.display(), e))),
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FilePrefs {
    fn get(&self, key: &str) -> Result<Option<PrefValue>, KeyValueError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: PrefValue) -> Result<(), KeyValueError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn delete_key(&self, key: &str) -> Result<(), KeyValueError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn save(&self) -> Result<(), KeyValueError> {
        let json = serde_json::to_string_pretty(&*self.entries.read())
            .map_err(|e| KeyValueError::Io(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| KeyValueError::Io(e.to_string()))?;
        }

        let temp = self.path.with_extension("tmp");
        let written = write_synced(&temp, json.as_bytes())
            .and_then(|()| fs::rename(&temp, &self.path));
        if let Err(e) = written {
            if temp.exists() {
                if let Err(cleanup) = fs::remove_file(&temp) {
                    log::warn!("Unable to clean up {:?}: {}", temp, cleanup);
                }
            }
            return Err(KeyValueError::Io(format!("{}: {}", self.path.display(), e)));
        }
        Ok(())
    }
}

/// Write a file and flush it to disk before returning
fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Reads the per-item `Collectible_<id> = 1` flags of older builds
pub struct LegacyPrefsFlags<'a> {
    prefs: &'a dyn KeyValueStore,
}

impl<'a> LegacyPrefsFlags<'a> {
    pub fn new(prefs: &'a dyn KeyValueStore) -> Self {
        Self { prefs }
    }

    pub fn key_for(id: &str) -> String {
        format!("{}{}", LEGACY_FLAG_PREFIX, id)
    }
}

impl LegacyFlagSource for LegacyPrefsFlags<'_> {
    fn is_flagged(&self, id: &str) -> bool {
        match self.prefs.get_int(&Self::key_for(id)) {
            Ok(value) => value == Some(1),
            Err(e) => {
                log::warn!("Could not read legacy flag for {}: {}", id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_prefs_typed_access() {
        let prefs = MemoryPrefs::new();
        prefs.set_int("Collectible_A", 1).unwrap();
        prefs.set_string("name", "Ana").unwrap();

        assert_eq!(prefs.get_int("Collectible_A").unwrap(), Some(1));
        assert_eq!(prefs.get_string("Collectible_A").unwrap(), None);
        assert_eq!(prefs.get_string("name").unwrap().as_deref(), Some("Ana"));

        prefs.delete_key("name").unwrap();
        assert_eq!(prefs.get("name").unwrap(), None);
    }

    #[test]
    fn test_file_prefs_persist_on_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = FilePrefs::open(&path).unwrap();
        prefs.set_int("HasPlayedBefore", 1).unwrap();
        prefs.set_string("SaveManager_SaveData", "{\"coins\":1}").unwrap();
        prefs.save().unwrap();

        let reopened = FilePrefs::open(&path).unwrap();
        assert_eq!(reopened.get_int("HasPlayedBefore").unwrap(), Some(1));
        assert_eq!(
            reopened.get_string("SaveManager_SaveData").unwrap().as_deref(),
            Some("{\"coins\":1}")
        );
    }

    #[test]
    fn test_file_prefs_save_replaces_whole_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let prefs = FilePrefs::open(&path).unwrap();
        prefs.set_string("SaveManager_SaveData", "{\"coins\":1}").unwrap();
        prefs.save().unwrap();
        prefs.set_string("SaveManager_SaveData", "{\"coins\":2}").unwrap();
        prefs.save().unwrap();

        assert!(!path.with_extension("tmp").exists());
        let reopened = FilePrefs::open(&path).unwrap();
        assert_eq!(
            reopened.get_string("SaveManager_SaveData").unwrap().as_deref(),
            Some("{\"coins\":2}")
        );
    }

    #[test]
    fn test_file_prefs_save_failure_keeps_old_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = FilePrefs::open(&path).unwrap();
        prefs.set_int("HasPlayedBefore", 1).unwrap();
        prefs.save().unwrap();

        // A directory on the staging path makes the synced write fail
        fs::create_dir(path.with_extension("tmp")).unwrap();
        prefs.set_int("HasPlayedBefore", 2).unwrap();
        assert!(matches!(prefs.save(), Err(KeyValueError::Io(_))));

        let reopened = FilePrefs::open(&path).unwrap();
        assert_eq!(reopened.get_int("HasPlayedBefore").unwrap(), Some(1));
    }

    #[test]
    fn test_file_prefs_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(FilePrefs::open(&path), Err(KeyValueError::Corrupt(_))));
    }

    #[test]
    fn test_legacy_flags() {
        let prefs = MemoryPrefs::new();
        prefs.set_int("Collectible_Bridge_Key", 1).unwrap();
        prefs.set_int("Collectible_Old_Coin", 0).unwrap();

        let flags = LegacyPrefsFlags::new(&prefs);
        assert!(flags.is_flagged("Bridge_Key"));
        assert!(!flags.is_flagged("Old_Coin"));
        assert!(!flags.is_flagged("Missing"));
    }
}
