use crate::antilink::AntilinkRegistry;
use crate::mutes::{GroupMuteStore, UserMuteStore};
use crate::warnings::WarningLedger;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Number of idle per-group locks kept before unused ones are dropped.
const GROUP_LOCK_PRUNE_THRESHOLD: usize = 256;

/// All moderation state of one bot process.
///
/// Built once at startup and shared by `Arc` with the command dispatcher and
/// the reconciler. Each store has its own short-lived lock; nothing here is
/// persisted.
#[derive(Debug, Default)]
pub struct ModerationState {
    pub warnings: WarningLedger,
    pub group_mutes: GroupMuteStore,
    pub user_mutes: UserMuteStore,
    pub antilink: AntilinkRegistry,
    group_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ModerationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Async lock serializing work that pairs a group's mute state with a
    /// WhatsApp side effect (mute + lock group, sweep + reopen group).
    ///
    /// Different groups get different locks.
    pub fn group_lock(&self, group_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .group_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks.len() >= GROUP_LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, l| Arc::strong_count(l) > 1);
        }
        locks
            .entry(group_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_instances_are_isolated() {
        let a = ModerationState::new();
        let b = ModerationState::new();
        a.warnings.add_warning("g1", "u1");
        a.group_mutes.mute("g1", "1h", "", Utc::now()).unwrap();
        a.antilink.enable("g1");
        assert_eq!(b.warnings.get_warnings("g1", "u1"), 0);
        assert!(!b.group_mutes.is_muted("g1", Utc::now()));
        assert!(!b.antilink.is_enabled("g1"));
    }

    #[test]
    fn test_group_lock_is_shared_per_group() {
        let state = ModerationState::new();
        let l1 = state.group_lock("g1");
        let l1_again = state.group_lock("g1");
        let l2 = state.group_lock("g2");
        assert!(Arc::ptr_eq(&l1, &l1_again));
        assert!(!Arc::ptr_eq(&l1, &l2));
    }

    #[tokio::test]
    async fn test_group_lock_excludes_same_group_only() {
        let state = ModerationState::new();
        let l1 = state.group_lock("g1");
        let _held = l1.lock().await;
        assert!(state.group_lock("g1").try_lock().is_err());
        assert!(state.group_lock("g2").try_lock().is_ok());
    }
}
