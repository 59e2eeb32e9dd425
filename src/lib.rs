//! Fresco coordinates a fleet of rate-limited worker accounts around two
//! scarce resources: short-lived externally harvested authorization tokens,
//! and a slowly regenerating per-account action allowance ("charges").
//!
//! The [`pool::TokenPool`] owns the token side: it pools, deduplicates and
//! expires credentials, hands out one lease per consumer, and signals exactly
//! once when the pool runs dry. The [`scheduler`] side turns per-account
//! telemetry into a deterministic status and a stable dashboard ordering on a
//! periodic tick.

pub mod constants;
pub mod error;
pub mod models;
pub mod pool;
pub mod registry;
pub mod scheduler;

pub use error::{AppError, AppResult};
pub use models::{Account, AppConfig, ChargePrediction, SchedulerConfig, TokenPoolConfig};
pub use pool::{PoolMetrics, PoolStatus, TokenLease, TokenPool};
pub use registry::AccountRegistry;
pub use scheduler::{
    build_queue_snapshot, AccountStatus, QueueEntry, QueueSnapshot, ScheduleRunner, StatusResult,
};
