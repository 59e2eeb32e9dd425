use crate::pool::metrics::PoolMetrics;
use serde::Serialize;
use serde_json::{Map, Value};

// A pooled credential. Owned by the pool while queued; moved into the
// in-flight registry once leased out.
#[derive(Debug, Clone)]
pub(crate) struct TokenEntry {
    pub value: String,
    pub received_at: i64,
    pub expires_at: i64,
    pub metadata: Map<String, Value>,
}

impl TokenEntry {
    pub fn lease(&self) -> TokenLease {
        TokenLease {
            token: self.value.clone(),
            metadata: self.metadata.clone(),
            received_at: self.received_at,
            expires_at: self.expires_at,
        }
    }
}

// Read-only handle to a pooled token, given to exactly one consumer. The
// consumer does not own the entry; it must report back via consume_token or
// invalidate_token.
#[derive(Debug, Clone, Serialize)]
pub struct TokenLease {
    pub token: String,
    pub metadata: Map<String, Value>,
    pub received_at: i64,
    pub expires_at: i64,
}

// Diagnostics snapshot for the monitoring endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub queue_size: usize,
    pub in_flight: usize,
    pub waiters: usize,
    // Age of the oldest queued entry, if any.
    pub oldest_age_ms: Option<i64>,
    pub needed: bool,
    pub metrics: PoolMetrics,
}
