//! Entity state definitions.

use serde::{Deserialize, Serialize};

use crate::util::vec3::Vec3;

/// Opaque identity of a connection or an externally-driven agent
///
/// Identities arrive as strings on the wire and are never minted server-side:
/// direct clients are keyed by their connection id, agents by whatever id the
/// driving connection reports for them.
pub type EntityId = String;

/// Last known state of one live identity
///
/// Created on first movement report, updated in place on every subsequent
/// report, removed when the owning connection disconnects. Has no lifecycle
/// of its own beyond the store entry that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub id: EntityId,
    pub position: Vec3,
    /// Milliseconds since the Unix epoch at the last accepted update
    pub timestamp: i64,
}

impl EntityState {
    pub fn new(id: impl Into<EntityId>, position: Vec3, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            position,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_state_new() {
        let state = EntityState::new("conn-1", Vec3::new(1.0, 2.0, 3.0), 42);
        assert_eq!(state.id, "conn-1");
        assert_eq!(state.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(state.timestamp, 42);
    }
}
