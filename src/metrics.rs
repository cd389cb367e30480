//! Sync-core counters
//!
//! Cheap atomic counters incremented on the hot paths; the hosting layer
//! decides how to expose them (this crate ships no metrics endpoint).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counter registry for the sync core
#[derive(Debug)]
pub struct SyncMetrics {
    /// Well-formed inbound messages accepted by the handler
    pub messages_received: AtomicU64,
    /// Single-entity updates applied to the store
    pub updates_applied: AtomicU64,
    /// Batched agent updates processed
    pub batches_processed: AtomicU64,
    /// Snapshots successfully handed to the pusher
    pub snapshots_pushed: AtomicU64,
    /// Per-recipient push failures (skipped recipients)
    pub push_failures: AtomicU64,
    /// Frames dropped as oversized or undecodable
    pub decode_failures: AtomicU64,

    start_time: Instant,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            updates_applied: AtomicU64::new(0),
            batches_processed: AtomicU64::new(0),
            snapshots_pushed: AtomicU64::new(0),
            push_failures: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Consistent-enough point-in-time read of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            updates_applied: self.updates_applied.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            snapshots_pushed: self.snapshots_pushed.load(Ordering::Relaxed),
            push_failures: self.push_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            uptime_seconds: self.uptime_seconds(),
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub updates_applied: u64,
    pub batches_processed: u64,
    pub snapshots_pushed: u64,
    pub push_failures: u64,
    pub decode_failures: u64,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = SyncMetrics::new();
        let snap = metrics.snapshot();
        assert_eq!(snap.messages_received, 0);
        assert_eq!(snap.push_failures, 0);
    }

    #[test]
    fn test_snapshot_reflects_increments() {
        let metrics = SyncMetrics::new();
        metrics.messages_received.fetch_add(3, Ordering::Relaxed);
        metrics.decode_failures.fetch_add(1, Ordering::Relaxed);

        let snap = metrics.snapshot();
        assert_eq!(snap.messages_received, 3);
        assert_eq!(snap.decode_failures, 1);
    }
}
