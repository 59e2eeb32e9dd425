use crate::constants;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub token_pool: TokenPoolConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPoolConfig {
    #[serde(default = "default_token_lifetime_ms")]
    pub token_lifetime_ms: i64,
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

fn default_token_lifetime_ms() -> i64 {
    constants::DEFAULT_TOKEN_LIFETIME_MS
}

fn default_max_queue_size() -> usize {
    constants::DEFAULT_MAX_QUEUE_SIZE
}

impl TokenPoolConfig {
    pub fn new() -> Self {
        Self {
            token_lifetime_ms: default_token_lifetime_ms(),
            max_queue_size: default_max_queue_size(),
        }
    }
}

impl Default for TokenPoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    // Random extra delay applied before each pass so a fleet of instances does
    // not hit the estimator in lockstep. 0/0 disables jitter.
    #[serde(default)]
    pub tick_jitter_min_secs: u64,
    #[serde(default)]
    pub tick_jitter_max_secs: u64,
    #[serde(default = "default_charge_threshold_fraction")]
    pub charge_threshold_fraction: f64,
    #[serde(default)]
    pub always_draw_on_charge: bool,
    #[serde(default = "default_droplet_reserve")]
    pub droplet_reserve: i64,
    #[serde(default = "default_max_retry_count")]
    pub default_max_retry: u32,
}

fn default_tick_interval_secs() -> u64 {
    constants::DEFAULT_TICK_INTERVAL_SECS
}

fn default_charge_threshold_fraction() -> f64 {
    constants::DEFAULT_CHARGE_THRESHOLD_FRACTION
}

fn default_droplet_reserve() -> i64 {
    constants::DEFAULT_DROPLET_RESERVE
}

fn default_max_retry_count() -> u32 {
    constants::DEFAULT_MAX_RETRY_COUNT
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            tick_jitter_min_secs: 0,
            tick_jitter_max_secs: 0,
            charge_threshold_fraction: default_charge_threshold_fraction(),
            always_draw_on_charge: false,
            droplet_reserve: default_droplet_reserve(),
            default_max_retry: default_max_retry_count(),
        }
    }

    // Jitter bounds are tolerated in either order.
    pub fn jitter_bounds(&self) -> (u64, u64) {
        if self.tick_jitter_min_secs <= self.tick_jitter_max_secs {
            (self.tick_jitter_min_secs, self.tick_jitter_max_secs)
        } else {
            (self.tick_jitter_max_secs, self.tick_jitter_min_secs)
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            token_pool: TokenPoolConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.token_pool.max_queue_size == 0 {
            return Err(AppError::Config(
                "token_pool.max_queue_size must be at least 1".to_string(),
            ));
        }
        if self.token_pool.token_lifetime_ms <= 0 {
            return Err(AppError::Config(
                "token_pool.token_lifetime_ms must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.scheduler.charge_threshold_fraction) {
            return Err(AppError::Config(format!(
                "scheduler.charge_threshold_fraction must be within 0..=1, got {}",
                self.scheduler.charge_threshold_fraction
            )));
        }
        if self.scheduler.tick_interval_secs == 0 {
            return Err(AppError::Config(
                "scheduler.tick_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_deserializes_from_empty_object() {
        let config: AppConfig = serde_json::from_str("{}").expect("defaults apply");
        assert_eq!(
            config.token_pool.max_queue_size,
            constants::DEFAULT_MAX_QUEUE_SIZE
        );
        assert_eq!(
            config.scheduler.charge_threshold_fraction,
            constants::DEFAULT_CHARGE_THRESHOLD_FRACTION
        );
        config.validate().expect("defaults must validate");
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut config = AppConfig::default();
        config.scheduler.charge_threshold_fraction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_queue_size() {
        let mut config = AppConfig::default();
        config.token_pool.max_queue_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn jitter_bounds_swap_when_reversed() {
        let mut config = SchedulerConfig::default();
        config.tick_jitter_min_secs = 30;
        config.tick_jitter_max_secs = 10;
        assert_eq!(config.jitter_bounds(), (10, 30));
    }
}
