//! Wire protocol for the sync service
//!
//! Two inbound message types and one outbound. Payloads are binary-encoded
//! with bincode's legacy config (fixed-size integers) so field layout stays
//! stable for non-Rust clients.

use serde::{Deserialize, Serialize};

use crate::util::vec3::Vec3;
use crate::world::state::{EntityId, EntityState};

/// Messages from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// A direct client reporting its own movement
    Position(PositionUpdate),
    /// A connection reporting movement for the agents it drives
    PositionBatch(BatchPositionUpdate),
}

/// Single-entity movement report
///
/// The reported identity is never trusted for the caller's own record: the
/// handler overwrites it with the authenticated connection id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: EntityId,
    pub position: Vec3,
}

/// One agent's entry in a batched report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPositionUpdate {
    pub id: EntityId,
    pub position: Vec3,
}

/// Batched movement report for many agents in one call
///
/// Amortizes per-call overhead for large agent populations; the handler
/// groups the resulting pushes to at most one outbound message per observer
/// per batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPositionUpdate {
    pub agents: Vec<AgentPositionUpdate>,
}

/// The one outbound message: a server-timestamped batch of entity states
///
/// Constructed fresh per dispatch and never stored. Hosting layers deliver it
/// to clients under the push method name `ReceiveWorldState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Milliseconds since the Unix epoch when the snapshot was assembled
    pub server_time: i64,
    pub players: Vec<EntityState>,
}

/// Encode a message using bincode
///
/// Uses legacy config for fixed-size integers (stable wire layout)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message using bincode
///
/// Uses legacy config for fixed-size integers (stable wire layout)
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    bincode::serde::decode_from_slice(data, bincode::config::legacy())
        .map(|(msg, _)| msg)
        .map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);
