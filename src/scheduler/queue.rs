use crate::models::Account;
use crate::scheduler::status::{AccountStatus, StatusResult};
use serde::{Deserialize, Serialize};

// Field names here are the wire contract consumed by the dashboard; the
// serialized shape must not drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeLevel {
    pub current: i64,
    pub max: f64,
    pub percentage: i64,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropletBalance {
    pub total: i64,
    // total minus the configured reserve, floored at zero.
    pub available: i64,
    pub reserve: i64,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: String,
    pub name: String,
    pub status: AccountStatus,
    pub cooldown_seconds: i64,
    pub charges: Option<ChargeLevel>,
    pub droplets: DropletBalance,
    pub retry_count: u32,
    pub max_retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_time: Option<i64>,
    pub suspended_until: i64,
}

// Project one account plus its resolved status into a dashboard record.
// Entries are rebuilt from scratch every tick, never mutated in place.
pub fn build_queue_entry(
    account: &Account,
    status: &StatusResult,
    droplet_reserve: i64,
    default_max_retry: u32,
) -> QueueEntry {
    let charges = account.charge_prediction.as_ref().map(|prediction| {
        let current = prediction.count.floor() as i64;
        let percentage = if prediction.max > 0.0 {
            ((current as f64 / prediction.max) * 100.0).round() as i64
        } else {
            0
        };
        ChargeLevel {
            current,
            max: prediction.max,
            percentage,
        }
    });

    QueueEntry {
        id: account.id.clone(),
        name: account.name.clone(),
        status: status.status,
        cooldown_seconds: status.cooldown_seconds,
        charges,
        droplets: DropletBalance {
            total: account.droplets,
            available: (account.droplets - droplet_reserve).max(0),
            reserve: droplet_reserve,
        },
        retry_count: account.retry_count,
        max_retry_count: account.max_retry_count.unwrap_or(default_max_retry),
        last_error_time: account.last_error_time,
        suspended_until: account.suspended_until,
    }
}
