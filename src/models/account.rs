use serde::{Deserialize, Serialize};

// Estimator output for one account: current charge level, capacity, and the
// time to regenerate a single unit. `count` is fractional because the
// estimator interpolates between observed samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargePrediction {
    pub count: f64,
    pub max: f64,
    pub cooldown_ms: i64,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_prediction: Option<ChargePrediction>,
    // Epoch ms; 0 means not suspended.
    #[serde(default)]
    pub suspended_until: i64,
    // True while a painting action is in flight for this account.
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retry_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_time: Option<i64>,
    // Spendable currency balance, unrelated to charges.
    #[serde(default)]
    pub droplets: i64,
    pub created_at: i64,
}

impl Account {
    pub fn new(id: String, name: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id,
            name,
            charge_prediction: None,
            suspended_until: 0,
            is_active: false,
            retry_count: 0,
            max_retry_count: None,
            last_error_time: None,
            droplets: 0,
            created_at: now,
        }
    }
}
