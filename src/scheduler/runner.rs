use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;

use crate::models::{Account, SchedulerConfig};
use crate::registry::AccountRegistry;
use crate::scheduler::queue::{build_queue_entry, QueueEntry};
use crate::scheduler::sort::sort_queue_entries;
use crate::scheduler::status::resolve_status;

// One full scheduling pass, published for the dashboard collaborator to
// serialize as-is.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueSnapshot {
    pub generated_at: i64,
    pub entries: Vec<QueueEntry>,
}

// Rolling last-minute view of pass activity, mirrored into the monitoring
// endpoint next to the pool counters.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerObservability {
    pub passes_last_minute: usize,
    pub accounts_scanned_last_minute: usize,
}

#[derive(Default)]
struct PassWindow {
    passes: VecDeque<(Instant, usize)>,
}

impl PassWindow {
    fn cleanup(&mut self, now: Instant) {
        let window_start = now.checked_sub(Duration::from_secs(60)).unwrap_or(now);
        while let Some((ts, _)) = self.passes.front() {
            if *ts < window_start {
                self.passes.pop_front();
            } else {
                break;
            }
        }
    }

    fn record(&mut self, accounts: usize) {
        let now = Instant::now();
        self.cleanup(now);
        self.passes.push_back((now, accounts));
    }

    fn snapshot(&mut self) -> SchedulerObservability {
        self.cleanup(Instant::now());
        SchedulerObservability {
            passes_last_minute: self.passes.len(),
            accounts_scanned_last_minute: self.passes.iter().map(|(_, n)| *n).sum(),
        }
    }
}

// Resolve, project and order every account in one deterministic pass. Pure in
// its inputs so the tick loop stays a thin shell around it.
pub fn build_queue_snapshot(
    accounts: &[Account],
    settings: &SchedulerConfig,
    now_ms: i64,
) -> QueueSnapshot {
    let mut entries: Vec<QueueEntry> = accounts
        .iter()
        .map(|account| {
            let status = resolve_status(account, account.charge_prediction.as_ref(), now_ms, settings);
            build_queue_entry(
                account,
                &status,
                settings.droplet_reserve,
                settings.default_max_retry,
            )
        })
        .collect();
    sort_queue_entries(&mut entries);

    QueueSnapshot {
        generated_at: now_ms,
        entries,
    }
}

// Periodic scheduling loop: every tick (plus optional jitter) it snapshots
// the registry, rebuilds the ordered queue and publishes it. Shutdown is
// cooperative through a cancellation token.
pub struct ScheduleRunner {
    registry: Arc<AccountRegistry>,
    config: SchedulerConfig,
    latest: Arc<RwLock<QueueSnapshot>>,
    window: Arc<Mutex<PassWindow>>,
    cancel: CancellationToken,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ScheduleRunner {
    pub fn new(registry: Arc<AccountRegistry>, config: SchedulerConfig) -> Self {
        Self {
            registry,
            config,
            latest: Arc::new(RwLock::new(QueueSnapshot::default())),
            window: Arc::new(Mutex::new(PassWindow::default())),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        let registry = self.registry.clone();
        let config = self.config.clone();
        let latest = self.latest.clone();
        let window = self.window.clone();
        let cancel = self.cancel.child_token();
        let (jitter_min, jitter_max) = self.config.jitter_bounds();

        let handle = tokio::spawn(async move {
            tracing::info!(
                interval_secs = config.tick_interval_secs,
                "Readiness scheduler started"
            );
            let mut interval = time::interval(Duration::from_secs(config.tick_interval_secs));

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Readiness scheduler received cancel signal");
                        break;
                    }
                    _ = interval.tick() => {}
                }

                let jitter_secs = if jitter_max == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(jitter_min..=jitter_max)
                };
                if jitter_secs > 0 {
                    tracing::debug!(jitter_secs, "Applying tick jitter before pass");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = time::sleep(Duration::from_secs(jitter_secs)) => {}
                    }
                }

                let accounts = registry.snapshot();
                let snapshot = build_queue_snapshot(
                    &accounts,
                    &config,
                    chrono::Utc::now().timestamp_millis(),
                );
                tracing::debug!(
                    accounts = accounts.len(),
                    "Scheduling pass completed"
                );

                if let Ok(mut window) = window.lock() {
                    window.record(accounts.len());
                }
                *latest.write().await = snapshot;
            }
        });

        // Abort a previous loop first so a double start cannot leak a task.
        if let Ok(mut guard) = self.task.lock() {
            if let Some(old) = guard.take() {
                old.abort();
                tracing::warn!("Aborted previous scheduler task");
            }
            *guard = Some(handle);
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
        if let Ok(mut guard) = self.task.lock() {
            if let Some(task) = guard.take() {
                task.abort();
            }
        }
    }

    pub async fn latest(&self) -> QueueSnapshot {
        self.latest.read().await.clone()
    }

    pub fn observability(&self) -> SchedulerObservability {
        match self.window.lock() {
            Ok(mut window) => window.snapshot(),
            Err(_) => SchedulerObservability {
                passes_last_minute: 0,
                accounts_scanned_last_minute: 0,
            },
        }
    }
}

impl Drop for ScheduleRunner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
