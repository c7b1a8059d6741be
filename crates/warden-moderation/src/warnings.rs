//! Per-group, per-user warning counters.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Warning counts keyed by group, then user.
///
/// Every operation runs under one lock, so concurrent increments for the
/// same key never lose an update.
#[derive(Debug, Default)]
pub struct WarningLedger {
    counts: Mutex<HashMap<String, HashMap<String, u32>>>,
}

impl WarningLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn counts(&self) -> MutexGuard<'_, HashMap<String, HashMap<String, u32>>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add one warning and return the new total.
    pub fn add_warning(&self, group_id: &str, user_id: &str) -> u32 {
        let mut counts = self.counts();
        let count = counts
            .entry(group_id.to_string())
            .or_default()
            .entry(user_id.to_string())
            .or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Current warning total, 0 if the user has none.
    pub fn get_warnings(&self, group_id: &str, user_id: &str) -> u32 {
        self.counts()
            .get(group_id)
            .and_then(|users| users.get(user_id))
            .copied()
            .unwrap_or(0)
    }

    /// Drop the user's warnings. Returns whether there was anything to clear.
    pub fn clear_warnings(&self, group_id: &str, user_id: &str) -> bool {
        let mut counts = self.counts();
        let Some(users) = counts.get_mut(group_id) else {
            return false;
        };
        let removed = users.remove(user_id).is_some();
        if users.is_empty() {
            counts.remove(group_id);
        }
        removed
    }

    /// All warned users in a group, highest count first.
    pub fn warnings_for_group(&self, group_id: &str) -> Vec<(String, u32)> {
        let mut list: Vec<(String, u32)> = self
            .counts()
            .get(group_id)
            .map(|users| users.iter().map(|(u, c)| (u.clone(), *c)).collect())
            .unwrap_or_default();
        list.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_returns_running_total() {
        let ledger = WarningLedger::new();
        assert_eq!(ledger.add_warning("g1", "u1"), 1);
        assert_eq!(ledger.add_warning("g1", "u1"), 2);
        assert_eq!(ledger.add_warning("g1", "u1"), 3);
        assert_eq!(ledger.get_warnings("g1", "u1"), 3);
    }

    #[test]
    fn test_counts_are_scoped_per_group_and_user() {
        let ledger = WarningLedger::new();
        ledger.add_warning("g1", "u1");
        ledger.add_warning("g2", "u1");
        ledger.add_warning("g2", "u1");
        assert_eq!(ledger.get_warnings("g1", "u1"), 1);
        assert_eq!(ledger.get_warnings("g2", "u1"), 2);
        assert_eq!(ledger.get_warnings("g1", "u2"), 0);
    }

    #[test]
    fn test_clear_resets_to_zero_and_is_idempotent() {
        let ledger = WarningLedger::new();
        for _ in 0..4 {
            ledger.add_warning("g1", "u1");
        }
        assert!(ledger.clear_warnings("g1", "u1"));
        assert_eq!(ledger.get_warnings("g1", "u1"), 0);
        assert!(!ledger.clear_warnings("g1", "u1"));
        assert!(!ledger.clear_warnings("nope", "u1"));
        assert_eq!(ledger.add_warning("g1", "u1"), 1);
    }

    #[test]
    fn test_warnings_for_group_sorted() {
        let ledger = WarningLedger::new();
        ledger.add_warning("g1", "a");
        ledger.add_warning("g1", "b");
        ledger.add_warning("g1", "b");
        ledger.add_warning("g2", "c");
        assert_eq!(
            ledger.warnings_for_group("g1"),
            vec![("b".to_string(), 2), ("a".to_string(), 1)]
        );
        assert!(ledger.warnings_for_group("g3").is_empty());
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let ledger = Arc::new(WarningLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        ledger.add_warning("g1", "u1");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ledger.get_warnings("g1", "u1"), 2000);
    }
}
