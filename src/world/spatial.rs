//! Uniform spatial hash grid used as the interest-management filter
//!
//! Buckets identities on the X/Z ground plane and answers "who is near this
//! position" by unioning the 3x3 block of cells around it. Updates and
//! removals are O(1); a neighborhood query touches nine cells regardless of
//! population size.

use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;

use crate::constants::grid::{CELL_INITIAL_CAPACITY, CELL_SIZE, GRID_INITIAL_CAPACITY};
use crate::util::vec3::Vec3;
use crate::world::state::EntityId;

/// Grid cell key - (x, z) cell coordinates (Y does not affect bucketing)
pub type CellKey = (i32, i32);

/// Inline capacity of a neighborhood query result before spilling to the heap
const QUERY_INLINE_CAPACITY: usize = 16;

/// Offsets covering the 3x3 block centered on a cell
const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, -1), (0, -1), (1, -1),
    (-1,  0), (0,  0), (1,  0),
    (-1,  1), (0,  1), (1,  1),
];

/// Identities found near a queried position
pub type Neighbors = SmallVec<[EntityId; QUERY_INLINE_CAPACITY]>;

struct GridInner {
    /// Map from cell key to the identities currently in that cell
    cells: HashMap<CellKey, HashSet<EntityId>, FxBuildHasher>,
    /// Map from identity to its currently recorded cell
    occupied: HashMap<EntityId, CellKey>,
}

/// Spatial hash grid over identity positions
///
/// The cell map and the per-identity bookkeeping map must move together: a
/// single mutex covers every mutation and every neighborhood query, so a
/// concurrent reader can never observe an identity missing from all cells or
/// present in two cells at once.
pub struct SpatialGrid {
    /// Cell size in world units (larger = fewer cells, more identities per cell)
    cell_size: f32,
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f32,
    inner: Mutex<GridInner>,
}

impl SpatialGrid {
    /// Create a grid with the given cell size
    ///
    /// Cell size should roughly match the interest radius: a query covers one
    /// cell length in every direction around the center cell.
    pub fn new(cell_size: f32) -> Self {
        debug_assert!(cell_size > 0.0);
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            inner: Mutex::new(GridInner {
                cells: HashMap::with_capacity_and_hasher(
                    GRID_INITIAL_CAPACITY,
                    FxBuildHasher::default(),
                ),
                occupied: HashMap::new(),
            }),
        }
    }

    /// Convert a world position to its cell key
    #[inline]
    pub fn cell_for(&self, position: Vec3) -> CellKey {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.z * self.inv_cell_size).floor() as i32,
        )
    }

    /// Record `id` at `position`, moving it between cells when needed
    ///
    /// Staying within the current cell is a no-op fast path; most updates move
    /// an identity a small distance or not at all. A cell change removes the
    /// id from its old member set and inserts it into the new one inside one
    /// critical section.
    pub fn update(&self, id: &str, position: Vec3) {
        let new_cell = self.cell_for(position);
        let inner = &mut *self.inner.lock();

        if let Some(&old_cell) = inner.occupied.get(id) {
            if old_cell == new_cell {
                return;
            }
            if let Some(members) = inner.cells.get_mut(&old_cell) {
                members.remove(id);
                if members.is_empty() {
                    inner.cells.remove(&old_cell);
                }
            }
        }

        inner
            .cells
            .entry(new_cell)
            .or_insert_with(|| HashSet::with_capacity(CELL_INITIAL_CAPACITY))
            .insert(id.to_owned());
        inner.occupied.insert(id.to_owned(), new_cell);
    }

    /// Discard `id` from whatever cell it occupies
    ///
    /// Removing an untracked id is a no-op.
    pub fn remove(&self, id: &str) {
        let inner = &mut *self.inner.lock();

        if let Some(cell) = inner.occupied.remove(id) {
            if let Some(members) = inner.cells.get_mut(&cell) {
                members.remove(id);
                if members.is_empty() {
                    inner.cells.remove(&cell);
                }
            }
        }
    }

    /// All identities in the 3x3 cell block centered on `position`
    ///
    /// Order is unspecified. An identity located in the queried region is
    /// included even if it is the party asking; callers decide whether to
    /// exclude themselves.
    pub fn query_neighbors(&self, position: Vec3) -> Neighbors {
        let (cx, cz) = self.cell_for(position);
        let mut result = Neighbors::new();

        let inner = self.inner.lock();
        for (dx, dz) in NEIGHBOR_OFFSETS {
            if let Some(members) = inner.cells.get(&(cx + dx, cz + dz)) {
                result.extend(members.iter().cloned());
            }
        }

        result
    }

    /// The cell currently recorded for `id`, if tracked
    pub fn cell_of(&self, id: &str) -> Option<CellKey> {
        self.inner.lock().occupied.get(id).copied()
    }

    /// Number of tracked identities
    pub fn len(&self) -> usize {
        self.inner.lock().occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get statistics about the grid
    pub fn stats(&self) -> GridStats {
        let inner = self.inner.lock();
        let total_members: usize = inner.cells.values().map(|c| c.len()).sum();
        let max_per_cell = inner.cells.values().map(|c| c.len()).max().unwrap_or(0);

        GridStats {
            occupied_cells: inner.cells.len(),
            tracked_entities: inner.occupied.len(),
            total_members,
            max_per_cell,
        }
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(CELL_SIZE)
    }
}

/// Statistics about the grid
///
/// `total_members == tracked_entities` holds whenever the grid is consistent:
/// every tracked identity is a member of exactly one cell.
#[derive(Debug, Clone)]
pub struct GridStats {
    pub occupied_cells: usize,
    pub tracked_entities: usize,
    pub total_members: usize,
    pub max_per_cell: usize,
}
