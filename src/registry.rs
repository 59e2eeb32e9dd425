use dashmap::DashMap;

use crate::error::{AppError, AppResult};
use crate::models::{Account, ChargePrediction};

// In-memory account telemetry store. The estimator and the worker-dispatch
// layer write through the methods below; the scheduler only ever reads a
// snapshot, so a pass observes a consistent copy of each account.
#[derive(Default)]
pub struct AccountRegistry {
    accounts: DashMap<String, Account>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    pub fn upsert(&self, account: Account) {
        tracing::debug!(id = %account.id, "Account registered");
        self.accounts.insert(account.id.clone(), account);
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.accounts.remove(id).is_some();
        if removed {
            tracing::info!(id = %id, "Account removed from registry");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Account> {
        self.accounts.get(id).map(|a| a.clone())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    // Estimator callback: replace the charge snapshot for one account.
    pub fn set_prediction(&self, id: &str, prediction: Option<ChargePrediction>) -> AppResult<()> {
        self.update(id, |account| account.charge_prediction = prediction)
    }

    pub fn set_active(&self, id: &str, is_active: bool) -> AppResult<()> {
        self.update(id, |account| account.is_active = is_active)
    }

    pub fn suspend_until(&self, id: &str, until_ms: i64) -> AppResult<()> {
        self.update(id, |account| account.suspended_until = until_ms)
    }

    pub fn set_droplets(&self, id: &str, droplets: i64) -> AppResult<()> {
        self.update(id, |account| account.droplets = droplets)
    }

    // Worker-layer bookkeeping after a failed painting attempt.
    pub fn record_error(&self, id: &str, at_ms: i64) -> AppResult<()> {
        self.update(id, |account| {
            account.retry_count += 1;
            account.last_error_time = Some(at_ms);
        })
    }

    pub fn clear_errors(&self, id: &str) -> AppResult<()> {
        self.update(id, |account| {
            account.retry_count = 0;
            account.last_error_time = None;
        })
    }

    // Sorted by id so consumers iterate deterministically.
    pub fn snapshot(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.accounts.iter().map(|a| a.clone()).collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        accounts
    }

    fn update<F>(&self, id: &str, apply: F) -> AppResult<()>
    where
        F: FnOnce(&mut Account),
    {
        match self.accounts.get_mut(id) {
            Some(mut account) => {
                apply(&mut account);
                Ok(())
            }
            None => Err(AppError::Account(format!("unknown account: {}", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(ids: &[&str]) -> AccountRegistry {
        let registry = AccountRegistry::new();
        for id in ids {
            registry.upsert(Account::new(id.to_string(), format!("painter-{}", id)));
        }
        registry
    }

    #[test]
    fn upsert_and_remove_roundtrip() {
        let registry = registry_with(&["a", "b"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert!(registry.get("a").is_none());
        assert!(registry.get("b").is_some());
    }

    #[test]
    fn telemetry_updates_apply() {
        let registry = registry_with(&["a"]);

        registry
            .set_prediction(
                "a",
                Some(ChargePrediction {
                    count: 10.0,
                    max: 100.0,
                    cooldown_ms: 30_000,
                }),
            )
            .unwrap();
        registry.set_active("a", true).unwrap();
        registry.suspend_until("a", 9_999).unwrap();
        registry.set_droplets("a", 750).unwrap();
        registry.record_error("a", 1_000).unwrap();
        registry.record_error("a", 2_000).unwrap();

        let account = registry.get("a").unwrap();
        assert!(account.charge_prediction.is_some());
        assert!(account.is_active);
        assert_eq!(account.suspended_until, 9_999);
        assert_eq!(account.droplets, 750);
        assert_eq!(account.retry_count, 2);
        assert_eq!(account.last_error_time, Some(2_000));

        registry.clear_errors("a").unwrap();
        let account = registry.get("a").unwrap();
        assert_eq!(account.retry_count, 0);
        assert!(account.last_error_time.is_none());
    }

    #[test]
    fn updates_on_unknown_account_error() {
        let registry = registry_with(&[]);
        assert!(registry.set_active("ghost", true).is_err());
    }

    #[test]
    fn snapshot_is_sorted_by_id() {
        let registry = registry_with(&["c", "a", "b"]);
        let ids: Vec<String> = registry.snapshot().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
