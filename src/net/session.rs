//! Process-wide session bookkeeping
//!
//! Tracks which identities are live direct connections and which agent
//! identities each connection drives, so a disconnect can reap everything the
//! connection brought into the world. Both mappings are safe for concurrent
//! per-key access; they are mutated only on connect/disconnect and on first
//! sight of a new agent identity.

use dashmap::{DashMap, DashSet};
use hashbrown::HashSet;
use tracing::debug;

use crate::world::state::EntityId;

/// Registry of active connections and agent ownership
///
/// Owned by the embedding application and injected into the handler, so tests
/// can construct a fresh registry per case instead of sharing process
/// statics.
pub struct SessionRegistry {
    /// Identities with a live transport connection
    active: DashSet<EntityId>,
    /// Connection id -> agent identities it has reported and therefore owns
    owned_agents: DashMap<EntityId, HashSet<EntityId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            active: DashSet::new(),
            owned_agents: DashMap::new(),
        }
    }

    /// Mark `conn_id` as an active direct connection
    pub fn on_connect(&self, conn_id: &str) {
        self.active.insert(conn_id.to_owned());
    }

    /// Unmark `conn_id` and drain the agent identities it owns
    ///
    /// The caller removes the returned identities (and the connection itself)
    /// from the world store; keeping that dependency out of the registry
    /// leaves it independently constructible.
    pub fn on_disconnect(&self, conn_id: &str) -> HashSet<EntityId> {
        self.active.remove(conn_id);
        let drained = self
            .owned_agents
            .remove(conn_id)
            .map(|(_, agents)| agents)
            .unwrap_or_default();
        if !drained.is_empty() {
            debug!(
                conn_id,
                agent_count = drained.len(),
                "draining owned agents on disconnect"
            );
        }
        drained
    }

    /// Merge `agent_ids` into the set owned by `conn_id`
    ///
    /// Union, not replacement: a connection may introduce new agents over
    /// time without losing previously registered ones. Re-registering an
    /// already-owned agent is a no-op.
    pub fn register_owned_agents<I>(&self, conn_id: &str, agent_ids: I)
    where
        I: IntoIterator<Item = EntityId>,
    {
        let mut owned = self.owned_agents.entry(conn_id.to_owned()).or_default();
        owned.extend(agent_ids);
    }

    /// Whether `id` is a live direct connection and may receive pushes
    ///
    /// Agents are never active; they have no transport connection.
    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    /// Number of live direct connections
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of agents currently owned by `conn_id`
    pub fn owned_agent_count(&self, conn_id: &str) -> usize {
        self.owned_agents
            .get(conn_id)
            .map(|owned| owned.len())
            .unwrap_or(0)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
