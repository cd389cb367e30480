//! Authoritative concurrent world store
//!
//! Holds the id -> state mapping and keeps the spatial index in lockstep with
//! it: every position mutation flows through [`WorldStore::move_player`] and
//! nothing else is allowed to touch stored positions.

use dashmap::DashMap;

use crate::constants::grid::CELL_SIZE;
use crate::util::time::unix_millis;
use crate::util::vec3::Vec3;
use crate::world::spatial::{Neighbors, SpatialGrid};
use crate::world::state::{EntityId, EntityState};

/// Concurrent mapping from identity to current state, paired with the grid
///
/// Entries are independently mutable; disjoint identities never contend.
pub struct WorldStore {
    entities: DashMap<EntityId, EntityState>,
    grid: SpatialGrid,
}

impl WorldStore {
    pub fn new() -> Self {
        Self::with_cell_size(CELL_SIZE)
    }

    /// Build a store over a grid with a non-default cell size
    pub fn with_cell_size(cell_size: f32) -> Self {
        Self {
            entities: DashMap::new(),
            grid: SpatialGrid::new(cell_size),
        }
    }

    /// Upsert the state for `id` and re-bucket it in the spatial index
    ///
    /// The single authoritative mutation entry point. Creates the entry at
    /// `position` with the current time when absent, otherwise overwrites
    /// position and timestamp in place. The grid commit happens while the
    /// entry guard is still held, so two racing calls for the same identity
    /// settle on one winner in both the store and the grid.
    pub fn move_player(&self, id: &str, position: Vec3) -> EntityState {
        let now = unix_millis();
        let entry = self
            .entities
            .entry(id.to_owned())
            .and_modify(|state| {
                state.position = position;
                state.timestamp = now;
            })
            .or_insert_with(|| EntityState::new(id, position, now));
        let state = entry.value().clone();
        self.grid.update(id, position);
        drop(entry);

        state
    }

    /// Delete the state for `id` and drop it from the spatial index
    ///
    /// Removing an unknown identity is a no-op.
    pub fn remove_player(&self, id: &str) {
        self.entities.remove(id);
        self.grid.remove(id);
    }

    /// Current state of one identity
    ///
    /// Each lookup is atomic on its own; an aggregate of several lookups is
    /// not a consistent point-in-time view.
    pub fn get(&self, id: &str) -> Option<EntityState> {
        self.entities.get(id).map(|state| state.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Cloned view of every stored state
    ///
    /// Assembled entry by entry while writers keep running: no transactional
    /// point-in-time guarantee across the whole collection.
    pub fn states(&self) -> Vec<EntityState> {
        self.entities
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Identities in the 3x3 cell neighborhood of `position`
    pub fn query_neighbors(&self, position: Vec3) -> Neighbors {
        self.grid.query_neighbors(position)
    }

    /// The spatial index backing this store
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for WorldStore {
    fn default() -> Self {
        Self::new()
    }
}
