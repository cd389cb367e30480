//! Sync protocol handler - the per-connection entry point
//!
//! Purely reactive: every inbound message makes one pass through
//! mutate -> neighborhood query -> snapshot assembly -> dispatch, and nothing
//! runs without an inbound call. All store and grid work completes before the
//! first push is handed to the transport, so a slow recipient cannot stall
//! unrelated updates.
//!
//! Requires a tokio runtime context; pushes ride on spawned tasks.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use hashbrown::HashMap;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::constants::{net::MAX_MESSAGE_SIZE, spawn};
use crate::metrics::SyncMetrics;
use crate::net::protocol::{
    decode, BatchPositionUpdate, ClientMessage, PositionUpdate, WorldSnapshot,
};
use crate::net::push::StatePusher;
use crate::net::session::SessionRegistry;
use crate::util::time::unix_millis;
use crate::world::state::{EntityId, EntityState};
use crate::world::store::WorldStore;

/// Per-connection protocol handler over shared world services
///
/// The store, registry and pusher are injected (no process statics), so a
/// test can stand up a fresh world per case.
pub struct SyncHandler<P: StatePusher> {
    store: Arc<WorldStore>,
    registry: Arc<SessionRegistry>,
    pusher: Arc<P>,
    metrics: Arc<SyncMetrics>,
}

impl<P: StatePusher> Clone for SyncHandler<P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            pusher: Arc::clone(&self.pusher),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<P: StatePusher> SyncHandler<P> {
    pub fn new(store: Arc<WorldStore>, registry: Arc<SessionRegistry>, pusher: Arc<P>) -> Self {
        Self {
            store,
            registry,
            pusher,
            metrics: Arc::new(SyncMetrics::new()),
        }
    }

    pub fn store(&self) -> &WorldStore {
        &self.store
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    /// Decode and route one inbound frame from `conn_id`
    ///
    /// Oversized or undecodable frames are logged and dropped: no state
    /// mutation, no response, connection left open.
    pub async fn handle_frame(&self, conn_id: &str, frame: &[u8]) {
        if frame.len() > MAX_MESSAGE_SIZE {
            warn!(conn_id, len = frame.len(), "dropping oversized frame");
            self.metrics.decode_failures.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let message: ClientMessage = match decode(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(conn_id, error = %e, "dropping undecodable frame");
                self.metrics.decode_failures.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        self.metrics
            .messages_received
            .fetch_add(1, Ordering::Relaxed);

        match message {
            ClientMessage::Position(update) => self.sync_position(conn_id, update),
            ClientMessage::PositionBatch(batch) => {
                self.sync_positions_batch(conn_id, batch).await
            }
        }
    }

    /// Register `conn_id` as live and seed its world entry at the origin
    ///
    /// No initial snapshot is pushed; the next update from any nearby party
    /// surfaces the newcomer.
    pub fn on_connect(&self, conn_id: &str) {
        self.registry.on_connect(conn_id);
        self.store.move_player(conn_id, spawn::DEFAULT_POSITION);
        info!(conn_id, "client connected");
    }

    /// Remove `conn_id` and everything it owned from the world
    pub fn on_disconnect(&self, conn_id: &str) {
        let orphans = self.registry.on_disconnect(conn_id);
        self.store.remove_player(conn_id);
        // Each removal stands alone; reaping one agent never blocks the rest.
        for agent_id in &orphans {
            self.store.remove_player(agent_id);
        }
        info!(conn_id, reaped_agents = orphans.len(), "client disconnected");
    }

    /// Apply a direct client's movement report and notify its neighborhood
    ///
    /// The caller's record is keyed by its authenticated connection id; the
    /// identity in the payload is ignored. Two snapshots share one server
    /// timestamp: the caller receives its neighborhood without its own echo,
    /// every other live observer receives the neighborhood including the
    /// caller. Dispatch is fire-and-forget relative to this call.
    pub fn sync_position(&self, conn_id: &str, update: PositionUpdate) {
        let own_state = self.store.move_player(conn_id, update.position);
        let observers = self.store.query_neighbors(update.position);
        let server_time = unix_millis();

        let mut without_caller = Vec::with_capacity(observers.len());
        let mut with_caller = Vec::with_capacity(observers.len());
        for observer in &observers {
            if observer.as_str() == conn_id {
                continue;
            }
            // An observer may have disconnected between query and lookup;
            // it is simply absent from the snapshot.
            if let Some(state) = self.store.get(observer) {
                without_caller.push(state.clone());
                with_caller.push(state);
            }
        }
        with_caller.push(own_state);

        if self.registry.is_active(conn_id) {
            self.dispatch(
                conn_id.to_owned(),
                WorldSnapshot {
                    server_time,
                    players: without_caller,
                },
            );
        }

        let others = WorldSnapshot {
            server_time,
            players: with_caller,
        };
        for observer in observers {
            if observer.as_str() == conn_id || !self.registry.is_active(&observer) {
                continue;
            }
            self.dispatch(observer, others.clone());
        }

        self.metrics.updates_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Apply a batch of agent movements and notify each affected observer once
    ///
    /// Registers the reported agents as owned by `conn_id`, then accumulates
    /// one growing snapshot per distinct live observer: each agent's state is
    /// appended to every observer that has it in range. At most one outbound
    /// message per observer per batch, dispatched concurrently; the call
    /// returns once every dispatch has finished.
    pub async fn sync_positions_batch(&self, conn_id: &str, batch: BatchPositionUpdate) {
        if batch.agents.is_empty() {
            return;
        }
        self.registry
            .register_owned_agents(conn_id, batch.agents.iter().map(|a| a.id.clone()));

        let server_time = unix_millis();
        let mut accumulated: HashMap<EntityId, Vec<EntityState>> = HashMap::new();
        for agent in &batch.agents {
            let state = self.store.move_player(&agent.id, agent.position);
            for observer in self.store.query_neighbors(agent.position) {
                // The caller drives the agents, it does not watch them; and
                // agents themselves are never push targets.
                if observer.as_str() == conn_id || !self.registry.is_active(&observer) {
                    continue;
                }
                accumulated.entry(observer).or_default().push(state.clone());
            }
        }
        self.metrics
            .batches_processed
            .fetch_add(1, Ordering::Relaxed);

        if accumulated.is_empty() {
            return;
        }

        let mut pushes = JoinSet::new();
        for (observer, players) in accumulated {
            let snapshot = WorldSnapshot {
                server_time,
                players,
            };
            let pusher = Arc::clone(&self.pusher);
            pushes.spawn(async move {
                let recipient = observer.clone();
                (recipient, pusher.push_world_state(observer, snapshot).await)
            });
        }
        while let Some(joined) = pushes.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {
                    self.metrics.snapshots_pushed.fetch_add(1, Ordering::Relaxed);
                }
                Ok((recipient, Err(e))) => {
                    self.metrics.push_failures.fetch_add(1, Ordering::Relaxed);
                    debug!(recipient = %recipient, error = %e, "batch push skipped");
                }
                Err(e) => {
                    warn!(error = %e, "push task failed");
                }
            }
        }
    }

    /// Fire-and-forget push to one recipient
    ///
    /// Failures are contained to the recipient and logged; nothing waits on
    /// the outcome.
    fn dispatch(&self, recipient: EntityId, snapshot: WorldSnapshot) {
        let pusher = Arc::clone(&self.pusher);
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            match pusher.push_world_state(recipient.clone(), snapshot).await {
                Ok(()) => {
                    metrics.snapshots_pushed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    metrics.push_failures.fetch_add(1, Ordering::Relaxed);
                    debug!(recipient = %recipient, error = %e, "push skipped");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::AgentPositionUpdate;
    use crate::net::push::ChannelPusher;
    use crate::util::vec3::Vec3;

    fn handler() -> SyncHandler<ChannelPusher> {
        SyncHandler::new(
            Arc::new(WorldStore::new()),
            Arc::new(SessionRegistry::new()),
            Arc::new(ChannelPusher::new()),
        )
    }

    #[tokio::test]
    async fn test_connect_seeds_store_at_origin() {
        let handler = handler();
        handler.on_connect("c1");

        assert!(handler.registry().is_active("c1"));
        let state = handler.store().get("c1").unwrap();
        assert_eq!(state.position, spawn::DEFAULT_POSITION);

        // Visible to a neighborhood query straight away
        let near = handler.store().query_neighbors(spawn::DEFAULT_POSITION);
        assert!(near.contains(&"c1".to_string()));
    }

    #[tokio::test]
    async fn test_reported_identity_is_overwritten() {
        let handler = handler();
        handler.on_connect("c1");

        handler.sync_position(
            "c1",
            PositionUpdate {
                id: "someone-else".to_string(),
                position: Vec3::new(10.0, 0.0, 10.0),
            },
        );

        assert!(handler.store().get("someone-else").is_none());
        let state = handler.store().get("c1").unwrap();
        assert_eq!(state.position, Vec3::new(10.0, 0.0, 10.0));
    }

    #[tokio::test]
    async fn test_batch_registers_ownership() {
        let handler = handler();
        handler.on_connect("driver");

        let batch = BatchPositionUpdate {
            agents: vec![
                AgentPositionUpdate {
                    id: "bot-1".to_string(),
                    position: Vec3::new(5.0, 0.0, 5.0),
                },
                AgentPositionUpdate {
                    id: "bot-2".to_string(),
                    position: Vec3::new(6.0, 0.0, 6.0),
                },
            ],
        };
        handler.sync_positions_batch("driver", batch).await;

        assert_eq!(handler.registry().owned_agent_count("driver"), 2);
        assert!(handler.store().contains("bot-1"));
        assert!(handler.store().contains("bot-2"));
    }

    #[tokio::test]
    async fn test_disconnect_reaps_owned_agents() {
        let handler = handler();
        handler.on_connect("driver");
        let batch = BatchPositionUpdate {
            agents: vec![AgentPositionUpdate {
                id: "bot-1".to_string(),
                position: Vec3::new(5.0, 0.0, 5.0),
            }],
        };
        handler.sync_positions_batch("driver", batch).await;

        handler.on_disconnect("driver");

        assert!(!handler.registry().is_active("driver"));
        assert!(handler.store().get("driver").is_none());
        assert!(handler.store().get("bot-1").is_none());
        assert!(handler
            .store()
            .query_neighbors(Vec3::new(5.0, 0.0, 5.0))
            .is_empty());
    }

    #[tokio::test]
    async fn test_malformed_frame_mutates_nothing() {
        let handler = handler();
        handler.on_connect("c1");
        let before = handler.store().len();

        handler.handle_frame("c1", &[0xde, 0xad, 0xbe, 0xef]).await;

        assert_eq!(handler.store().len(), before);
        assert_eq!(handler.metrics().snapshot().decode_failures, 1);
        assert_eq!(handler.metrics().snapshot().messages_received, 0);
    }

    #[tokio::test]
    async fn test_oversized_frame_dropped() {
        let handler = handler();
        handler.on_connect("c1");

        let frame = vec![0u8; MAX_MESSAGE_SIZE + 1];
        handler.handle_frame("c1", &frame).await;

        assert_eq!(handler.metrics().snapshot().decode_failures, 1);
    }
}
