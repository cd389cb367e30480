//! Meridian Sync Server Core
//!
//! The server-side core of a real-time multiplayer position-synchronization
//! service: a concurrent authoritative world store, a uniform-grid spatial
//! index used for interest management, and a reactive sync protocol handler
//! that pushes each connected client only the world state near it.
//!
//! Transport hosting (connection upgrade, framing, service wiring) belongs to
//! the embedding application: it forwards lifecycle events and inbound frames
//! to [`net::sync::SyncHandler`] and implements outbound delivery behind
//! [`net::push::StatePusher`].

pub mod constants;
pub mod util;
pub mod world;
pub mod net;
pub mod metrics;
