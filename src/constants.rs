//! Fixed configuration constants for the sync core.

use crate::util::vec3::Vec3;

/// Interest-management grid constants
pub mod grid {
    /// Side length of one grid cell (world units)
    ///
    /// Identities bucket on the X/Z ground plane; a neighborhood query covers
    /// the 3x3 cell block around a position, so an observer sees everything
    /// within at least one cell length in each direction.
    pub const CELL_SIZE: f32 = 50.0;

    /// Initial capacity for the cell map (number of expected non-empty cells)
    pub const GRID_INITIAL_CAPACITY: usize = 256;

    /// Initial capacity for member sets within a cell
    pub const CELL_INITIAL_CAPACITY: usize = 8;
}

/// Spawn constants
pub mod spawn {
    use super::Vec3;

    /// Where a freshly connected client is seeded before its first movement
    /// report arrives
    pub const DEFAULT_POSITION: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

/// Networking constants
pub mod net {
    /// Maximum inbound frame size accepted by the handler
    pub const MAX_MESSAGE_SIZE: usize = 65536;
}
