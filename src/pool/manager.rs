use std::collections::VecDeque;

use serde_json::{Map, Value};
use tokio::sync::{oneshot, Mutex};

use crate::error::{AppError, AppResult};
use crate::models::TokenPoolConfig;
use crate::pool::metrics::PoolMetrics;
use crate::pool::notify::{NeededNotifier, NeededSubscription};
use crate::pool::types::{PoolStatus, TokenEntry, TokenLease};

type WaiterTx = oneshot::Sender<AppResult<TokenLease>>;

// Everything the pool mutates lives behind one mutex, so supply, consume,
// invalidate and waiter dispatch never interleave. Waiters complete through a
// oneshot that is awaited outside the lock.
struct PoolState {
    queue: VecDeque<TokenEntry>,
    in_flight: VecDeque<TokenEntry>,
    waiters: VecDeque<WaiterTx>,
    // Edge trigger for the "token needed" signal: set when the signal has
    // fired for the current empty stretch, cleared as soon as the queue
    // refills.
    needed_raised: bool,
    metrics: PoolMetrics,
}

impl PoolState {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: VecDeque::new(),
            waiters: VecDeque::new(),
            needed_raised: false,
            metrics: PoolMetrics::default(),
        }
    }
}

// Pools short-lived credentials captured by the harvesting side and hands
// them out to painting workers, one lease per request, strictly FIFO when
// workers have to wait.
pub struct TokenPool {
    config: TokenPoolConfig,
    state: Mutex<PoolState>,
    notifier: NeededNotifier,
}

impl TokenPool {
    pub fn new(config: TokenPoolConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PoolState::new()),
            notifier: NeededNotifier::new(),
        }
    }

    // Register an observer for the "token needed" signal. Handlers run
    // synchronously while the pool lock is held and must not call back into
    // the pool.
    pub fn subscribe_needed<F>(&self, handler: F) -> NeededSubscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier.subscribe(handler)
    }

    // Obtain a lease. Resolves immediately while the queue is non-empty;
    // otherwise parks a FIFO waiter until the harvester supplies a token or
    // flush() rejects everyone. No built-in timeout: callers racing this
    // against a deadline should pass the lease value back explicitly if they
    // still win it late.
    pub async fn request_token(&self) -> AppResult<TokenLease> {
        let rx = {
            let mut state = self.state.lock().await;
            self.purge_expired(&mut state);

            if let Some(entry) = state.queue.pop_front() {
                let lease = entry.lease();
                state.in_flight.push_back(entry);
                state.metrics.served += 1;
                self.refresh_needed(&mut state);
                tracing::debug!(token = %lease.token, "Lease granted immediately");
                return Ok(lease);
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            tracing::debug!(waiters = state.waiters.len(), "Token queue empty, parking waiter");
            self.refresh_needed(&mut state);
            rx
        };

        match rx.await {
            Ok(result) => result,
            // Sender dropped without a reply only happens when the pool itself
            // is torn down mid-wait.
            Err(_) => Err(AppError::CacheFlushed("token pool dropped".to_string())),
        }
    }

    // Accept a harvested credential. Empty values are silently ignored.
    // Duplicate values refresh the existing entry instead of creating a
    // second one; overflow evicts the oldest queued entry.
    pub async fn supply_token(&self, value: &str, metadata: Option<Map<String, Value>>) {
        if value.trim().is_empty() {
            tracing::debug!("Ignoring supply with empty token value");
            return;
        }

        let mut state = self.state.lock().await;
        self.purge_expired(&mut state);

        let now = now_ms();
        let metadata = metadata.unwrap_or_default();
        state.metrics.received += 1;

        if let Some(existing) = state.queue.iter_mut().find(|e| e.value == value) {
            existing.expires_at = expiry_for(&metadata, now, self.config.token_lifetime_ms);
            existing.metadata = metadata;
            state.metrics.deduplicated += 1;
            tracing::debug!(token = %value, "Duplicate token refreshed in queue");
        } else if let Some(existing) = state.in_flight.iter_mut().find(|e| e.value == value) {
            // A leased copy is already out; only the metadata is worth
            // refreshing, the lease keeps its original expiry.
            existing.metadata = metadata;
            state.metrics.deduplicated += 1;
            tracing::debug!(token = %value, "Duplicate token refreshed in flight");
        } else {
            let entry = TokenEntry {
                value: value.to_string(),
                received_at: now,
                expires_at: expiry_for(&metadata, now, self.config.token_lifetime_ms),
                metadata,
            };
            state.queue.push_back(entry);
            if state.queue.len() > self.config.max_queue_size {
                if let Some(evicted) = state.queue.pop_front() {
                    state.metrics.dropped += 1;
                    tracing::debug!(token = %evicted.value, "Queue full, evicted oldest token");
                }
            }
        }

        self.dispatch_waiters(&mut state);
        self.refresh_needed(&mut state);
    }

    // Mark a leased token as successfully spent and drop it for good.
    // Returns whether an entry was actually removed.
    pub async fn consume_token(&self, value: Option<&str>) -> bool {
        let mut state = self.state.lock().await;
        self.purge_expired(&mut state);

        let taken = Self::take_entry(&mut state, value);
        if let Some(entry) = &taken {
            state.metrics.consumed += 1;
            tracing::debug!(token = %entry.value, "Token consumed");
        }
        self.refresh_needed(&mut state);
        taken.is_some()
    }

    // Same lookup as consume_token, but the token was refused downstream.
    pub async fn invalidate_token(&self, value: Option<&str>) -> bool {
        let mut state = self.state.lock().await;
        self.purge_expired(&mut state);

        let taken = Self::take_entry(&mut state, value);
        if let Some(entry) = &taken {
            state.metrics.invalidated += 1;
            tracing::debug!(token = %entry.value, "Token invalidated");
        }
        self.refresh_needed(&mut state);
        taken.is_some()
    }

    // Drop every queued and in-flight entry and reject all pending waiters.
    // The "needed" signal re-fires so the harvesting side restarts.
    pub async fn flush(&self, reason: &str) {
        let mut state = self.state.lock().await;

        let queued = state.queue.len();
        let leased = state.in_flight.len();
        state.queue.clear();
        state.in_flight.clear();

        let waiters: Vec<WaiterTx> = state.waiters.drain(..).collect();
        let rejected = waiters.len();
        for tx in waiters {
            let _ = tx.send(Err(AppError::CacheFlushed(reason.to_string())));
        }

        state.needed_raised = false;
        self.refresh_needed(&mut state);

        tracing::warn!(
            reason = %reason,
            queued,
            leased,
            rejected,
            "Token pool flushed"
        );
    }

    pub async fn status(&self) -> PoolStatus {
        let mut state = self.state.lock().await;
        self.purge_expired(&mut state);
        self.refresh_needed(&mut state);

        let now = now_ms();
        PoolStatus {
            queue_size: state.queue.len(),
            in_flight: state.in_flight.len(),
            waiters: state.waiters.len(),
            oldest_age_ms: state.queue.front().map(|e| now - e.received_at),
            needed: state.needed_raised,
            metrics: state.metrics.clone(),
        }
    }

    // Non-consuming copy of the head entry.
    pub async fn peek(&self) -> Option<TokenLease> {
        let mut state = self.state.lock().await;
        self.purge_expired(&mut state);
        self.refresh_needed(&mut state);
        state.queue.front().map(TokenEntry::lease)
    }

    // Expiry is lazy: every operation sweeps both registries before touching
    // anything, so an expired entry can never be observed.
    fn purge_expired(&self, state: &mut PoolState) {
        let now = now_ms();
        let before = state.queue.len() + state.in_flight.len();
        state.queue.retain(|e| e.expires_at > now);
        state.in_flight.retain(|e| e.expires_at > now);
        let removed = before - state.queue.len() - state.in_flight.len();
        if removed > 0 {
            state.metrics.expired += removed as u64;
            tracing::debug!(removed, "Purged expired tokens");
        }
    }

    // Serve parked waiters FIFO, one entry each, moving entries in flight. A
    // waiter whose receiver is already gone is skipped and the entry goes
    // back to the head of the queue.
    fn dispatch_waiters(&self, state: &mut PoolState) {
        while !state.queue.is_empty() {
            let Some(tx) = state.waiters.pop_front() else {
                break;
            };
            let Some(entry) = state.queue.pop_front() else {
                state.waiters.push_front(tx);
                break;
            };
            let lease = entry.lease();
            match tx.send(Ok(lease)) {
                Ok(()) => {
                    state.in_flight.push_back(entry);
                    state.metrics.served += 1;
                }
                Err(_) => {
                    tracing::debug!(token = %entry.value, "Waiter abandoned, token requeued");
                    state.queue.push_front(entry);
                }
            }
        }
    }

    // Removal target for consume/invalidate: the named in-flight entry when
    // found, else the oldest in-flight entry, else the oldest queued entry.
    // With several leases outstanding the unnamed fallback is ambiguous, so
    // lease holders should always pass their token value.
    fn take_entry(state: &mut PoolState, value: Option<&str>) -> Option<TokenEntry> {
        if let Some(v) = value {
            if let Some(pos) = state.in_flight.iter().position(|e| e.value == v) {
                return state.in_flight.remove(pos);
            }
        }
        if let Some(entry) = state.in_flight.pop_front() {
            return Some(entry);
        }
        state.queue.pop_front()
    }

    // Edge-triggered needed flag: fires once per genuine transition into an
    // empty queue, clears silently as soon as the queue refills.
    fn refresh_needed(&self, state: &mut PoolState) {
        if state.queue.is_empty() {
            if !state.needed_raised {
                state.needed_raised = true;
                tracing::debug!("Token queue empty, raising needed signal");
                self.notifier.notify();
            }
        } else {
            state.needed_raised = false;
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// Harvest metadata may carry an explicit expiry ("expiresAt", epoch ms) or a
// relative ttl ("ttlMs"); otherwise the configured lifetime applies.
fn expiry_for(metadata: &Map<String, Value>, received_at: i64, default_lifetime_ms: i64) -> i64 {
    if let Some(expires_at) = metadata.get("expiresAt").and_then(Value::as_i64) {
        return expires_at;
    }
    if let Some(ttl_ms) = metadata.get("ttlMs").and_then(Value::as_i64) {
        return received_at + ttl_ms;
    }
    received_at + default_lifetime_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_prefers_explicit_expires_at() {
        let mut metadata = Map::new();
        metadata.insert("expiresAt".to_string(), serde_json::json!(5_000));
        metadata.insert("ttlMs".to_string(), serde_json::json!(60_000));
        assert_eq!(expiry_for(&metadata, 1_000, 110_000), 5_000);
    }

    #[test]
    fn expiry_falls_back_to_ttl_then_default() {
        let mut metadata = Map::new();
        metadata.insert("ttlMs".to_string(), serde_json::json!(2_500));
        assert_eq!(expiry_for(&metadata, 1_000, 110_000), 3_500);
        assert_eq!(expiry_for(&Map::new(), 1_000, 110_000), 111_000);
    }
}
