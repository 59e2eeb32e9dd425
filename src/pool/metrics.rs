use serde::Serialize;

// Cumulative counters for one pool instance. Monotonic for the lifetime of the
// pool; flush does not reset them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolMetrics {
    // Every non-empty supply call, including duplicates.
    pub received: u64,
    // Supplies whose value already existed (queued or in flight).
    pub deduplicated: u64,
    // Entries purged after their expiry passed.
    pub expired: u64,
    // Oldest entries evicted by queue overflow.
    pub dropped: u64,
    // Leases handed out, immediate or via a waiter.
    pub served: u64,
    pub consumed: u64,
    pub invalidated: u64,
}
