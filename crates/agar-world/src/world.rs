//! The world model: bounds plus the last known state of every entity.

use std::collections::{HashMap, HashSet};

use agar_protocol::{UpdateEvent, WorldBounds};
use serde::{Deserialize, Serialize};

/// A read-only view of the game world.
///
/// Only [`WorldStore`](crate::WorldStore) mutates a `World`; everyone else
/// gets a cloned snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub(crate) bounds: Option<WorldBounds>,
    pub(crate) entities: HashMap<u32, UpdateEvent>,
    pub(crate) owned: HashSet<u32>,
}

impl World {
    /// Bounds from the most recent `GameAreaSize`, if any arrived yet.
    pub fn bounds(&self) -> Option<WorldBounds> {
        self.bounds
    }

    /// All known entities keyed by id.
    pub fn entities(&self) -> &HashMap<u32, UpdateEvent> {
        &self.entities
    }

    pub fn get(&self, entity_id: u32) -> Option<&UpdateEvent> {
        self.entities.get(&entity_id)
    }

    /// Ids of cells this client controls.
    pub fn owned(&self) -> &HashSet<u32> {
        &self.owned
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
