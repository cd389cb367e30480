//! Outbound snapshot delivery seam
//!
//! The hosting layer owns the actual transport; the core hands it finished
//! snapshots through [`StatePusher`]. Delivery may suspend on network I/O,
//! which is why the handler never holds a store or grid lock once dispatch
//! begins.

use std::future::Future;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::net::protocol::WorldSnapshot;
use crate::world::state::EntityId;

/// Delivery failure for a single recipient
///
/// Always contained to that recipient: the handler logs it and carries on
/// with the rest of the dispatch.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("recipient {0} has no open outbound channel")]
    Disconnected(EntityId),
    #[error("outbound channel for {0} is closed")]
    ChannelClosed(EntityId),
}

/// Pushes one snapshot to one recipient
///
/// Implementations deliver the message to the client under the push method
/// name `ReceiveWorldState`. The returned future must be `Send`; the handler
/// awaits it on spawned tasks.
pub trait StatePusher: Send + Sync + 'static {
    fn push_world_state(
        &self,
        recipient: EntityId,
        snapshot: WorldSnapshot,
    ) -> impl Future<Output = Result<(), PushError>> + Send;
}

/// In-process pusher backed by per-recipient unbounded channels
///
/// The reference [`StatePusher`] implementation: integration tests and
/// benches read the receivers directly, and it doubles as a working model for
/// transport implementations (register a recipient on connect, drop it on
/// disconnect).
pub struct ChannelPusher {
    outboxes: DashMap<EntityId, mpsc::UnboundedSender<WorldSnapshot>>,
}

impl ChannelPusher {
    pub fn new() -> Self {
        Self {
            outboxes: DashMap::new(),
        }
    }

    /// Open an outbound channel for `recipient`, replacing any previous one
    pub fn open(&self, recipient: &str) -> mpsc::UnboundedReceiver<WorldSnapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outboxes.insert(recipient.to_owned(), tx);
        rx
    }

    /// Drop the outbound channel for `recipient`
    pub fn close(&self, recipient: &str) {
        self.outboxes.remove(recipient);
    }

    /// Whether `recipient` currently has an open channel
    pub fn is_open(&self, recipient: &str) -> bool {
        self.outboxes.contains_key(recipient)
    }
}

impl Default for ChannelPusher {
    fn default() -> Self {
        Self::new()
    }
}

impl StatePusher for ChannelPusher {
    fn push_world_state(
        &self,
        recipient: EntityId,
        snapshot: WorldSnapshot,
    ) -> impl Future<Output = Result<(), PushError>> + Send {
        let result = match self.outboxes.get(&recipient) {
            Some(tx) => tx
                .send(snapshot)
                .map_err(|_| PushError::ChannelClosed(recipient)),
            None => Err(PushError::Disconnected(recipient)),
        };
        std::future::ready(result)
    }
}
