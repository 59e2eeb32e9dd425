pub mod queue;
pub mod runner;
pub mod sort;
pub mod status;

pub use queue::{build_queue_entry, ChargeLevel, DropletBalance, QueueEntry};
pub use runner::{build_queue_snapshot, QueueSnapshot, ScheduleRunner, SchedulerObservability};
pub use sort::sort_queue_entries;
pub use status::{resolve_status, AccountStatus, StatusResult};
