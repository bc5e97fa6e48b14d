//! The world store: sole owner of the live [`World`].
//!
//! # Concurrency note
//!
//! The dispatch loop writes, any number of callers read. A
//! `parking_lot::RwLock` guards the world; every method takes the lock
//! for exactly one operation and never across an `.await`, so decoding
//! and applying updates can't stall transport I/O.
//!
//! All `register_*` operations are idempotent: applying the same event
//! set twice leaves the world as applying it once.

use agar_protocol::{EatEvent, UpdateEvent, WorldBounds};
use parking_lot::RwLock;

use crate::World;

/// Thread-safe owner of the game world.
#[derive(Debug, Default)]
pub struct WorldStore {
    world: RwLock<World>,
}

impl WorldStore {
    /// Creates an empty store: no bounds, no entities.
    pub fn new() -> Self {
        Self::default()
    }

    // -- Writes --

    /// Replaces the world bounds.
    pub fn set_bounds(&self, bounds: WorldBounds) {
        tracing::debug!(?bounds, "world bounds set");
        self.world.write().bounds = Some(bounds);
    }

    /// Applies eat events.
    ///
    /// Only the victim is gone. The eater keeps its last known state until
    /// an update (usually in the same packet) replaces it.
    pub fn register_eats(&self, events: &[EatEvent]) {
        if events.is_empty() {
            return;
        }
        let mut world = self.world.write();
        for event in events {
            world.entities.remove(&event.victim_id);
            world.owned.remove(&event.victim_id);
        }
    }

    /// Upserts entities, replacing any previous state wholesale.
    pub fn register_updates(&self, events: &[UpdateEvent]) {
        if events.is_empty() {
            return;
        }
        let mut world = self.world.write();
        for event in events {
            world.entities.insert(event.entity_id, event.clone());
        }
    }

    /// Deletes entities. Unknown ids are ignored.
    pub fn register_removals(&self, ids: &[u32]) {
        if ids.is_empty() {
            return;
        }
        let mut world = self.world.write();
        for id in ids {
            world.entities.remove(id);
            world.owned.remove(id);
        }
    }

    /// Records a cell this client controls.
    pub fn register_owned(&self, entity_id: u32) {
        tracing::debug!(entity_id, "owned cell registered");
        self.world.write().owned.insert(entity_id);
    }

    /// Drops every entity and owned id. Bounds survive a reset.
    pub fn reset(&self) {
        let mut world = self.world.write();
        tracing::debug!(entities = world.entities.len(), "world reset");
        world.entities.clear();
        world.owned.clear();
    }

    // -- Reads --

    /// A cloned snapshot of the whole world.
    pub fn snapshot(&self) -> World {
        self.world.read().clone()
    }

    pub fn bounds(&self) -> Option<WorldBounds> {
        self.world.read().bounds
    }

    pub fn entity(&self, entity_id: u32) -> Option<UpdateEvent> {
        self.world.read().entities.get(&entity_id).cloned()
    }

    pub fn entity_count(&self) -> usize {
        self.world.read().entities.len()
    }

    /// Ids of owned cells, in ascending order.
    pub fn owned_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.world.read().owned.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: u32, x: u32, name: &str) -> UpdateEvent {
        UpdateEvent {
            entity_id: id,
            x,
            y: 0,
            radius: 10,
            color: (1, 2, 3),
            flags: 0,
            skin_url: None,
            name: name.into(),
        }
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = WorldStore::new();
        assert_eq!(store.bounds(), None);
        assert_eq!(store.entity_count(), 0);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_set_bounds_replaces() {
        let store = WorldStore::new();
        let first = WorldBounds { min_x: 0.0, min_y: 0.0, max_x: 10.0, max_y: 10.0 };
        let second = WorldBounds { max_x: 20.0, ..first };
        store.set_bounds(first);
        store.set_bounds(second);
        assert_eq!(store.bounds(), Some(second));
    }

    #[test]
    fn test_register_updates_replaces_whole_record() {
        let store = WorldStore::new();
        let mut with_skin = update(7, 1, "bot");
        with_skin.skin_url = Some("%skin".into());
        store.register_updates(&[with_skin]);
        store.register_updates(&[update(7, 2, "renamed")]);

        let entity = store.entity(7).unwrap();
        assert_eq!(entity.x, 2);
        assert_eq!(entity.name, "renamed");
        assert_eq!(entity.skin_url, None, "no field-level merge");
    }

    #[test]
    fn test_register_updates_is_idempotent() {
        let events = [update(1, 1, "a"), update(2, 2, "b")];
        let once = WorldStore::new();
        once.register_updates(&events);
        let twice = WorldStore::new();
        twice.register_updates(&events);
        twice.register_updates(&events);
        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn test_register_removals_is_idempotent() {
        let store = WorldStore::new();
        store.register_updates(&[update(1, 1, "a"), update(2, 2, "b")]);
        store.register_removals(&[1]);
        let after_once = store.snapshot();
        store.register_removals(&[1]);
        assert_eq!(store.snapshot(), after_once);
        assert!(store.entity(1).is_none());
        assert!(store.entity(2).is_some());
    }

    #[test]
    fn test_removing_unknown_id_is_noop() {
        let store = WorldStore::new();
        store.register_updates(&[update(1, 1, "a")]);
        let before = store.snapshot();
        store.register_removals(&[999]);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_eat_removes_victim_keeps_eater() {
        let store = WorldStore::new();
        store.register_updates(&[update(1, 1, "eater"), update(2, 2, "victim")]);
        store.register_eats(&[EatEvent { eater_id: 1, victim_id: 2 }]);
        assert_eq!(store.entity(1).unwrap().x, 1);
        assert!(store.entity(2).is_none());
    }

    #[test]
    fn test_owned_cells_pruned_on_removal_and_eat() {
        let store = WorldStore::new();
        store.register_owned(5);
        store.register_owned(3);
        store.register_owned(9);
        assert_eq!(store.owned_ids(), vec![3, 5, 9]);

        store.register_removals(&[5]);
        store.register_eats(&[EatEvent { eater_id: 1, victim_id: 9 }]);
        assert_eq!(store.owned_ids(), vec![3]);
    }

    #[test]
    fn test_reset_keeps_bounds() {
        let store = WorldStore::new();
        let bounds = WorldBounds { min_x: 0.0, min_y: 0.0, max_x: 1.0, max_y: 1.0 };
        store.set_bounds(bounds);
        store.register_updates(&[update(1, 1, "a")]);
        store.register_owned(1);
        store.reset();
        assert_eq!(store.entity_count(), 0);
        assert!(store.owned_ids().is_empty());
        assert_eq!(store.bounds(), Some(bounds));
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        use std::sync::Arc;

        let store = Arc::new(WorldStore::new());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 1..=500 {
                    store.register_updates(&[update(i, i, "w")]);
                }
            })
        };
        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let mut last = 0;
                for _ in 0..500 {
                    let n = store.entity_count();
                    assert!(n >= last, "entity count went backwards");
                    last = n;
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(store.entity_count(), 500);
    }
}
