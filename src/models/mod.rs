pub mod account;
pub mod config;

pub use account::{Account, ChargePrediction};
pub use config::{AppConfig, SchedulerConfig, TokenPoolConfig};
