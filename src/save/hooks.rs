//! Collaborator interfaces
//!
//! What the save coordinator needs from the rest of the game. Movement,
//! scene management and the like implement these; the coordinator never owns
//! that state.

use super::record::{ResourceCounters, Vec3};

/// Pull-model source of the live player state
pub trait PlayerSnapshotSource {
    /// Current world position
    fn position(&self) -> Vec3;

    /// Current resource counts, if the source tracks them
    fn counters(&self) -> Option<ResourceCounters> {
        None
    }

    /// Move the player to a loaded position
    fn warp_to(&mut self, position: Vec3);
}

/// World objects that can be collected
pub trait CollectibleWorld {
    /// Ids of every collectible currently in the world
    fn collectible_ids(&self) -> Vec<String>;

    /// Hide an already collected object
    fn hide_collectible(&mut self, id: &str);
}

/// A world with no collectibles, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyWorld;

impl CollectibleWorld for EmptyWorld {
    fn collectible_ids(&self) -> Vec<String> {
        Vec::new()
    }

    fn hide_collectible(&mut self, _id: &str) {}
}
