//! Save subsystem configuration
//!
//! Loaded from a RON file, with fallback to defaults for anything missing.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::save::backend::DEFAULT_KEY_VALUE_KEY;
use crate::save::record::DEFAULT_PLAYER_NAME;

/// Autosave never fires more often than this
pub const MIN_AUTOSAVE_INTERVAL_SECS: f32 = 5.0;

/// Which storage backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// Temp file + backup + rename under the save root
    #[default]
    Filesystem,
    /// One entry in the host's key-value preference store
    KeyValue,
}

/// Save subsystem settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Writable root; `None` uses the platform data directory
    pub root: Option<PathBuf>,
    pub backend: BackendKind,
    /// Entry name used by the key-value backend
    pub key_value_key: String,
    /// Seconds between autosaves, 0 disables
    pub autosave_interval_secs: f32,
    pub starting_coins: u32,
    pub starting_lives: u32,
    pub default_player_name: String,
    /// Indent the saved JSON
    pub pretty_json: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            root: None,
            backend: BackendKind::Filesystem,
            key_value_key: DEFAULT_KEY_VALUE_KEY.to_string(),
            autosave_interval_secs: 30.0,
            starting_coins: 0,
            starting_lives: 3,
            default_player_name: DEFAULT_PLAYER_NAME.to_string(),
            pretty_json: true,
        }
    }
}

impl SaveConfig {
    /// Load from a RON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match Self::from_ron(&content) {
                    Ok(config) => return config,
                    Err(e) => log::warn!("Failed to parse {:?}: {}. Using defaults.", path, e),
                },
                Err(e) => log::warn!("Failed to read {:?}: {}. Using defaults.", path, e),
            }
        }
        Self::default()
    }

    /// Parse RON text
    pub fn from_ron(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }

    /// Directory the filesystem backend writes under
    pub fn save_root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(default_save_root)
    }

    /// Effective autosave period, `None` when autosave is off
    pub fn autosave_interval(&self) -> Option<Duration> {
        autosave_period(self.autosave_interval_secs)
    }
}

/// Clamp a requested autosave interval to the scheduling floor.
///
/// Intervals too large for a `Duration` saturate to `Duration::MAX`.
pub fn autosave_period(secs: f32) -> Option<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        None
    } else {
        let secs = secs.max(MIN_AUTOSAVE_INTERVAL_SECS);
        Some(Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX))
    }
}

/// Platform data directory for saves
pub fn default_save_root() -> PathBuf {
    use directories::ProjectDirs;

    if let Some(proj_dirs) = ProjectDirs::from("com", "odyssey", "Odyssey") {
        let mut path = proj_dirs.data_local_dir().to_path_buf();
        path.push("saves");
        path
    } else {
        // Fallback to current directory
        PathBuf::from("./saves")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SaveConfig::default();
        assert_eq!(config.starting_lives, 3);
        assert_eq!(config.starting_coins, 0);
        assert_eq!(config.key_value_key, "SaveManager_SaveData");
        assert_eq!(config.autosave_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_autosave_floor() {
        assert_eq!(autosave_period(1.0), Some(Duration::from_secs(5)));
        assert_eq!(autosave_period(12.0), Some(Duration::from_secs(12)));
        assert_eq!(autosave_period(0.0), None);
        assert_eq!(autosave_period(-3.0), None);
        assert_eq!(autosave_period(f32::NAN), None);
    }

    #[test]
    fn test_autosave_overflow_saturates() {
        assert_eq!(autosave_period(f32::MAX), Some(Duration::MAX));
        assert_eq!(autosave_period(1e30), Some(Duration::MAX));

        let config = SaveConfig::from_ron("(autosave_interval_secs: 1e30)").unwrap();
        assert_eq!(config.autosave_interval(), Some(Duration::MAX));
    }

    #[test]
    fn test_partial_ron() {
        let config = SaveConfig::from_ron(
            "(backend: KeyValue, autosave_interval_secs: 10.0, root: Some(\"/tmp/odyssey\"))",
        )
        .unwrap();
        assert_eq!(config.backend, BackendKind::KeyValue);
        assert_eq!(config.save_root(), PathBuf::from("/tmp/odyssey"));
        assert_eq!(config.starting_lives, 3);
        assert_eq!(config.default_player_name, "Default Name");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = SaveConfig::load(Path::new("does/not/exist.ron"));
        assert_eq!(config, SaveConfig::default());
    }
}
