//! Save record data model
//!
//! The snapshot of player progress that gets written to durable storage.

use serde::{Deserialize, Serialize};

use super::error::ParseError;
use super::ledger::CollectibleLedger;

/// Name used when a save does not carry one
pub const DEFAULT_PLAYER_NAME: &str = "Default Name";

/// World-space position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Resource counts carried between sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCounters {
    #[serde(default)]
    pub coins: u32,
    #[serde(default)]
    pub lives: u32,
}

impl ResourceCounters {
    pub const fn new(coins: u32, lives: u32) -> Self {
        Self { coins, lives }
    }
}

/// Complete persisted snapshot of a player
///
/// Field names on disk match the documents written by earlier releases,
/// so old `savedata.json` files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    /// Last known world position
    #[serde(default)]
    pub position: Vec3,
    /// Coins and lives, stored flat next to the other fields
    #[serde(flatten)]
    pub counters: ResourceCounters,
    /// Player display name
    #[serde(rename = "playerName", default = "default_display_name")]
    pub display_name: String,
    /// Every collectible ever unlocked
    #[serde(rename = "collectedCollectibleIds", default)]
    pub collected: CollectibleLedger,
}

fn default_display_name() -> String {
    DEFAULT_PLAYER_NAME.to_string()
}

impl Default for SaveRecord {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            counters: ResourceCounters::default(),
            display_name: default_display_name(),
            collected: CollectibleLedger::new(),
        }
    }
}

impl SaveRecord {
    /// Fresh record for a new game
    pub fn fresh(counters: ResourceCounters, display_name: impl Into<String>) -> Self {
        Self {
            position: Vec3::ZERO,
            counters,
            display_name: display_name.into(),
            collected: CollectibleLedger::new(),
        }
    }

    /// Serialize to the on-disk JSON document
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Parse a stored document.
    ///
    /// Blank input and `null` are rejected: a record that fails to parse must
    /// never turn into a default one.
    pub fn from_bytes(bytes: &[u8], target: &str) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ParseError::new(target, e))?;
        if text.trim().is_empty() {
            return Err(ParseError::new(target, "document is empty"));
        }
        serde_json::from_str(text).map_err(|e| ParseError::new(target, e))
    }

    /// Check whether a collectible has been unlocked
    pub fn has_collected(&self, id: &str) -> bool {
        self.collected.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record() {
        let record = SaveRecord::fresh(ResourceCounters::new(0, 3), "Traveller");
        assert_eq!(record.counters.coins, 0);
        assert_eq!(record.counters.lives, 3);
        assert_eq!(record.display_name, "Traveller");
        assert!(record.collected.is_empty());
    }

    #[test]
    fn test_reads_legacy_document() {
        let json = r#"{
            "position": {"x": 1.5, "y": -2.0, "z": 0.0},
            "coins": 12,
            "lives": 2,
            "playerName": "Ana",
            "collectedCollectibleIds": ["Forest_Waterfall_Secret", "Bridge_Key"]
        }"#;
        let record = SaveRecord::from_bytes(json.as_bytes(), "test").unwrap();
        assert_eq!(record.position, Vec3::new(1.5, -2.0, 0.0));
        assert_eq!(record.counters, ResourceCounters::new(12, 2));
        assert_eq!(record.display_name, "Ana");
        assert!(record.has_collected("Bridge_Key"));
    }

    #[test]
    fn test_missing_name_uses_placeholder() {
        let record = SaveRecord::from_bytes(br#"{"coins": 4}"#, "test").unwrap();
        assert_eq!(record.display_name, DEFAULT_PLAYER_NAME);
        assert_eq!(record.counters.coins, 4);
        assert_eq!(record.counters.lives, 0);
    }

    #[test]
    fn test_on_disk_field_names() {
        let mut record = SaveRecord::default();
        record.collected.insert("A");
        let json = record.to_json(false).unwrap();
        assert!(json.contains("\"playerName\""));
        assert!(json.contains("\"collectedCollectibleIds\":[\"A\"]"));
        assert!(json.contains("\"coins\":0"));
        assert!(!json.contains("counters"));
    }

    #[test]
    fn test_rejects_blank_null_and_garbage() {
        assert!(SaveRecord::from_bytes(b"", "test").is_err());
        assert!(SaveRecord::from_bytes(b"  \n ", "test").is_err());
        assert!(SaveRecord::from_bytes(b"null", "test").is_err());
        assert!(SaveRecord::from_bytes(b"{\"coins\": 3", "test").is_err());
        assert!(SaveRecord::from_bytes(b"{\"coins\": -1}", "test").is_err());
    }

    #[test]
    fn test_duplicate_ids_collapse_on_load() {
        let json = br#"{"collectedCollectibleIds": ["a", "b", "a"]}"#;
        let record = SaveRecord::from_bytes(json, "test").unwrap();
        assert_eq!(record.collected.ids(), ["a".to_string(), "b".to_string()]);
    }
}
