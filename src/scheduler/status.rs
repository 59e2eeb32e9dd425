use crate::models::{Account, ChargePrediction, SchedulerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountStatus {
    // An action is currently in flight for the account.
    Active,
    // Charge level at or above the draw threshold.
    Ready,
    // Regenerating towards the threshold.
    Cooldown,
    // Parked by the dispatch layer (not produced by the resolver).
    Waiting,
    Suspended,
    // No charge telemetry yet.
    NoData,
}

// Rank table for queue ordering; lower sorts first. Anything unranked lands
// behind everything known.
pub(crate) fn priority_rank(status: AccountStatus) -> u8 {
    match status {
        AccountStatus::Active => 1,
        AccountStatus::Ready => 2,
        AccountStatus::Cooldown => 3,
        AccountStatus::Waiting => 4,
        AccountStatus::Suspended => 5,
        AccountStatus::NoData => 6,
    }
}

// Recomputed every tick; carries no identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusResult {
    pub status: AccountStatus,
    pub cooldown_seconds: i64,
    pub ready_increment: u32,
}

impl StatusResult {
    fn plain(status: AccountStatus) -> Self {
        Self {
            status,
            cooldown_seconds: 0,
            ready_increment: 0,
        }
    }
}

// Pure mapping from one account's telemetry to a status. Deterministic in
// (account, prediction, now, settings); malformed telemetry degrades to
// NoData instead of erroring.
pub fn resolve_status(
    account: &Account,
    prediction: Option<&ChargePrediction>,
    now_ms: i64,
    settings: &SchedulerConfig,
) -> StatusResult {
    if account.suspended_until > now_ms {
        return StatusResult {
            status: AccountStatus::Suspended,
            cooldown_seconds: ceil_ms_to_secs(account.suspended_until - now_ms),
            ready_increment: 0,
        };
    }

    if account.is_active {
        return StatusResult::plain(AccountStatus::Active);
    }

    let Some(prediction) = prediction else {
        return StatusResult::plain(AccountStatus::NoData);
    };

    let threshold = if settings.always_draw_on_charge {
        1
    } else {
        ((prediction.max * settings.charge_threshold_fraction).floor() as i64).max(1)
    };
    let current = prediction.count.floor() as i64;

    if current >= threshold {
        return StatusResult {
            status: AccountStatus::Ready,
            cooldown_seconds: 0,
            ready_increment: 1,
        };
    }

    let deficit = threshold - current;
    StatusResult {
        status: AccountStatus::Cooldown,
        cooldown_seconds: ceil_ms_to_secs(deficit * prediction.cooldown_ms),
        ready_increment: 0,
    }
}

fn ceil_ms_to_secs(ms: i64) -> i64 {
    (ms + 999) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str) -> Account {
        Account::new(id.to_string(), format!("painter-{}", id))
    }

    fn prediction(count: f64, max: f64, cooldown_ms: i64) -> ChargePrediction {
        ChargePrediction {
            count,
            max,
            cooldown_ms,
        }
    }

    #[test]
    fn suspended_wins_over_everything() {
        let mut acc = account("a");
        acc.suspended_until = 10_500;
        acc.is_active = true;
        acc.charge_prediction = Some(prediction(100.0, 100.0, 30_000));

        let result = resolve_status(
            &acc,
            acc.charge_prediction.as_ref(),
            10_000,
            &SchedulerConfig::default(),
        );
        assert_eq!(result.status, AccountStatus::Suspended);
        // 500ms remaining rounds up to a full second.
        assert_eq!(result.cooldown_seconds, 1);
    }

    #[test]
    fn expired_suspension_is_ignored() {
        let mut acc = account("a");
        acc.suspended_until = 9_000;
        acc.is_active = true;

        let result = resolve_status(&acc, None, 10_000, &SchedulerConfig::default());
        assert_eq!(result.status, AccountStatus::Active);
    }

    #[test]
    fn missing_prediction_degrades_to_no_data() {
        let acc = account("a");
        let result = resolve_status(&acc, None, 0, &SchedulerConfig::default());
        assert_eq!(result.status, AccountStatus::NoData);
        assert_eq!(result.cooldown_seconds, 0);
    }

    #[test]
    fn ready_at_threshold_boundary() {
        let acc = account("a");
        let settings = SchedulerConfig {
            charge_threshold_fraction: 0.8,
            ..SchedulerConfig::default()
        };

        // max=100, threshold=80: 81 is ready, 79 is cooling down.
        let ready = resolve_status(&acc, Some(&prediction(81.0, 100.0, 30_000)), 0, &settings);
        assert_eq!(ready.status, AccountStatus::Ready);
        assert_eq!(ready.ready_increment, 1);

        let cooling = resolve_status(&acc, Some(&prediction(79.0, 100.0, 30_000)), 0, &settings);
        assert_eq!(cooling.status, AccountStatus::Cooldown);
        assert_eq!(cooling.cooldown_seconds, 30); // ceil(1 * 30000 / 1000)
    }

    #[test]
    fn fractional_count_floors_before_compare() {
        let acc = account("a");
        let settings = SchedulerConfig {
            charge_threshold_fraction: 0.8,
            ..SchedulerConfig::default()
        };

        let result = resolve_status(&acc, Some(&prediction(79.9, 100.0, 30_000)), 0, &settings);
        assert_eq!(result.status, AccountStatus::Cooldown);
    }

    #[test]
    fn always_draw_lowers_threshold_to_one() {
        let acc = account("a");
        let settings = SchedulerConfig {
            always_draw_on_charge: true,
            ..SchedulerConfig::default()
        };

        let result = resolve_status(&acc, Some(&prediction(1.0, 100.0, 30_000)), 0, &settings);
        assert_eq!(result.status, AccountStatus::Ready);

        let empty = resolve_status(&acc, Some(&prediction(0.4, 100.0, 30_000)), 0, &settings);
        assert_eq!(empty.status, AccountStatus::Cooldown);
        assert_eq!(empty.cooldown_seconds, 30);
    }

    #[test]
    fn threshold_never_drops_below_one() {
        let acc = account("a");
        let settings = SchedulerConfig {
            charge_threshold_fraction: 0.1,
            ..SchedulerConfig::default()
        };

        // floor(5 * 0.1) = 0, clamped to 1.
        let result = resolve_status(&acc, Some(&prediction(0.0, 5.0, 30_000)), 0, &settings);
        assert_eq!(result.status, AccountStatus::Cooldown);
        assert_eq!(result.cooldown_seconds, 30);
    }

    #[test]
    fn resolve_is_deterministic() {
        let mut acc = account("a");
        acc.droplets = 1_000;
        let settings = SchedulerConfig::default();
        let pred = prediction(42.5, 100.0, 30_000);

        let first = resolve_status(&acc, Some(&pred), 123_456, &settings);
        let second = resolve_status(&acc, Some(&pred), 123_456, &settings);
        assert_eq!(first, second);
    }
}
