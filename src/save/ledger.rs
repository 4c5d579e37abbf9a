//! Collected item ledger
//!
//! The set of collectibles a player has unlocked, plus the one-shot import
//! from the old per-item flag store.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Answers whether the legacy flag store marks an item as collected
pub trait LegacyFlagSource {
    fn is_flagged(&self, id: &str) -> bool;
}

/// Ordered, duplicate-free list of collected item ids
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CollectibleLedger {
    ids: Vec<String>,
    index: HashSet<String>,
}

impl CollectibleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is usable as a collectible identifier
    pub fn is_valid_id(id: &str) -> bool {
        !id.trim().is_empty()
    }

    /// Add an id. Returns false for duplicates and invalid ids.
    pub fn insert(&mut self, id: &str) -> bool {
        if !Self::is_valid_id(id) || self.index.contains(id) {
            return false;
        }
        self.index.insert(id.to_string());
        self.ids.push(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Import every candidate the legacy store has flagged.
    ///
    /// Returns how many ids were newly added; running it again with the same
    /// inputs adds nothing.
    pub fn import_legacy<'a, I>(&mut self, candidates: I, flags: &dyn LegacyFlagSource) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut added = 0;
        for id in candidates {
            if !Self::is_valid_id(id) || self.contains(id) {
                continue;
            }
            if flags.is_flagged(id) && self.insert(id) {
                added += 1;
            }
        }
        if added > 0 {
            log::info!("Imported {} collectible(s) from legacy flags", added);
        }
        added
    }
}

impl PartialEq for CollectibleLedger {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl From<Vec<String>> for CollectibleLedger {
    fn from(ids: Vec<String>) -> Self {
        let mut ledger = Self::new();
        for id in &ids {
            ledger.insert(id);
        }
        ledger
    }
}

impl From<CollectibleLedger> for Vec<String> {
    fn from(ledger: CollectibleLedger) -> Self {
        ledger.ids
    }
}
