pub mod manager;
pub mod metrics;
pub mod notify;
pub mod types;


pub use manager::TokenPool;
pub use metrics::PoolMetrics;
pub use notify::{NeededNotifier, NeededSubscription};
pub use types::{PoolStatus, TokenLease};
