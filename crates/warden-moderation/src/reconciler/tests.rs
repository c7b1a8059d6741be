use super::*;
use async_trait::async_trait;
use chrono::{TimeDelta, TimeZone};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Notify};
use warden_core::error::WardenError;
use warden_core::message::IncomingMessage;

type Hook = Box<dyn Fn() + Send + Sync>;

/// Channel that records every call and can be told to fail or stall.
#[derive(Default)]
struct RecordingChannel {
    announce_calls: Mutex<Vec<(String, bool)>>,
    sent: Mutex<Vec<OutgoingMessage>>,
    fail_restore: AtomicBool,
    fail_send: AtomicBool,
    /// Runs inside `set_group_announce`, before it returns.
    on_restore: Mutex<Option<Hook>>,
    /// When set, `set_group_announce` signals `entered` and waits for `release`.
    stall: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl RecordingChannel {
    fn announce_calls(&self) -> Vec<(String, bool)> {
        self.announce_calls.lock().unwrap().clone()
    }

    fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, WardenError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), WardenError> {
        self.sent.lock().unwrap().push(message);
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(WardenError::Channel("send refused".into()));
        }
        Ok(())
    }

    async fn set_group_announce(&self, group_id: &str, announce: bool) -> Result<(), WardenError> {
        self.announce_calls
            .lock()
            .unwrap()
            .push((group_id.to_string(), announce));
        if let Some((entered, release)) = &self.stall {
            entered.notify_one();
            release.notified().await;
        }
        if let Some(hook) = self.on_restore.lock().unwrap().as_ref() {
            hook();
        }
        if self.fail_restore.load(Ordering::SeqCst) {
            return Err(WardenError::Channel("timeout".into()));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), WardenError> {
        Ok(())
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn mins(n: i64) -> TimeDelta {
    TimeDelta::minutes(n)
}

fn setup(channel: RecordingChannel) -> (Arc<ModerationState>, Arc<RecordingChannel>, Reconciler) {
    let state = Arc::new(ModerationState::new());
    let channel = Arc::new(channel);
    let reconciler = Reconciler::new(state.clone(), channel.clone());
    (state, channel, reconciler)
}

#[tokio::test]
async fn test_sweep_unmutes_expired_group_and_user() {
    let (state, channel, reconciler) = setup(RecordingChannel::default());
    state.group_mutes.mute("g1", "10m", "spam", t0()).unwrap();
    state.user_mutes.mute("g2", "u1@s.whatsapp.net", "5m", "", t0()).unwrap();

    let report = reconciler.run_expiry_sweep(t0() + mins(10)).await;

    assert_eq!(report.groups_unmuted, 1);
    assert_eq!(report.users_unmuted, 1);
    assert_eq!(channel.announce_calls(), vec![("g1".to_string(), false)]);

    let sent = channel.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].reply_target.as_deref(), Some("g1"));
    assert_eq!(sent[0].text, GROUP_UNMUTED_NOTICE);
    assert_eq!(sent[1].reply_target.as_deref(), Some("g2"));
    assert_eq!(sent[1].mentions, vec!["u1@s.whatsapp.net".to_string()]);
    assert!(sent[1].text.contains("@u1"));

    assert!(state.group_mutes.expired(t0() + mins(10)).is_empty());
    assert!(state.user_mutes.expired(t0() + mins(10)).is_empty());
    assert!(state.group_mutes.record("g1").is_none());
    assert_eq!(state.user_mutes.group_count(), 0);
}

#[tokio::test]
async fn test_sweep_clears_state_even_when_external_calls_fail() {
    let channel = RecordingChannel::default();
    channel.fail_restore.store(true, Ordering::SeqCst);
    channel.fail_send.store(true, Ordering::SeqCst);
    let (state, channel, reconciler) = setup(channel);
    state.group_mutes.mute("g1", "10m", "", t0()).unwrap();
    state.user_mutes.mute("g1", "u1", "10m", "", t0()).unwrap();

    let report = reconciler.run_expiry_sweep(t0() + mins(11)).await;

    assert_eq!(channel.announce_calls().len(), 1);
    assert_eq!(channel.sent().len(), 2);
    assert_eq!(report.restore_failures, 1);
    assert_eq!(report.notify_failures, 2);
    assert!(state.group_mutes.record("g1").is_none());
    assert_eq!(state.user_mutes.group_count(), 0);
    // Retries are off by default.
    assert!(reconciler.pending_restores().is_empty());
}

#[tokio::test]
async fn test_sweep_leaves_live_mutes_alone() {
    let (state, channel, reconciler) = setup(RecordingChannel::default());
    state.group_mutes.mute("g1", "1h", "", t0()).unwrap();
    state.user_mutes.mute("g1", "u1", "1h", "", t0()).unwrap();

    let report = reconciler.run_expiry_sweep(t0() + mins(59)).await;

    assert!(report.is_idle());
    assert!(channel.announce_calls().is_empty());
    assert!(channel.sent().is_empty());
    assert!(state.group_mutes.is_muted("g1", t0() + mins(59)));
    assert!(state.user_mutes.is_muted("g1", "u1", t0() + mins(59)));
}

#[tokio::test]
async fn test_second_sweep_is_a_noop() {
    let (state, channel, reconciler) = setup(RecordingChannel::default());
    state.group_mutes.mute("g1", "1m", "", t0()).unwrap();

    reconciler.run_expiry_sweep(t0() + mins(2)).await;
    let report = reconciler.run_expiry_sweep(t0() + mins(3)).await;

    assert!(report.is_idle());
    assert_eq!(channel.announce_calls().len(), 1);
    assert_eq!(channel.sent().len(), 1);
}

#[tokio::test]
async fn test_fresh_mute_during_restore_survives() {
    let (state, channel, reconciler) = setup(RecordingChannel::default());
    state.group_mutes.mute("g1", "10m", "old", t0()).unwrap();

    // A writer that bypasses the group lock re-mutes while the reopen call is in flight.
    let racing_state = state.clone();
    *channel.on_restore.lock().unwrap() = Some(Box::new(move || {
        racing_state
            .group_mutes
            .mute("g1", "1h", "fresh", t0() + mins(10))
            .unwrap();
    }));

    let report = reconciler.run_expiry_sweep(t0() + mins(10)).await;

    let record = state.group_mutes.record("g1").expect("fresh mute must survive");
    assert_eq!(record.reason, "fresh");
    assert_eq!(record.end_time, t0() + mins(70));
    assert_eq!(report.groups_unmuted, 0);
    assert_eq!(report.superseded, 1);
    assert!(channel.sent().is_empty());
}

#[tokio::test]
async fn test_superseded_before_sweep_reaches_group() {
    let (state, channel, reconciler) = setup(RecordingChannel::default());
    state.group_mutes.mute("g1", "10m", "", t0()).unwrap();
    let reconciler = Arc::new(reconciler);

    // Hold the group lock, as a mute command would, while the sweep snapshots.
    let lock = state.group_lock("g1");
    let held = lock.lock().await;
    let sweep = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.run_expiry_sweep(t0() + mins(10)).await })
    };
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    state
        .group_mutes
        .mute("g1", "1h", "again", t0() + mins(10))
        .unwrap();
    drop(held);

    let report = sweep.await.unwrap();
    assert_eq!(report.superseded, 1);
    assert_eq!(report.groups_unmuted, 0);
    assert_eq!(state.group_mutes.record("g1").unwrap().reason, "again");
    assert!(channel.announce_calls().is_empty());
    assert!(channel.sent().is_empty());
}

#[tokio::test]
async fn test_overlapping_sweep_is_skipped() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let channel = RecordingChannel {
        stall: Some((entered.clone(), release.clone())),
        ..Default::default()
    };
    let (state, channel, reconciler) = setup(channel);
    state.group_mutes.mute("g1", "1m", "", t0()).unwrap();
    let reconciler = Arc::new(reconciler);

    let first = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.run_expiry_sweep(t0() + mins(1)).await })
    };
    entered.notified().await;

    let second = reconciler.run_expiry_sweep(t0() + mins(1)).await;
    assert!(second.skipped);

    release.notify_one();
    let first = first.await.unwrap();
    assert!(!first.skipped);
    assert_eq!(first.groups_unmuted, 1);
    assert_eq!(channel.announce_calls().len(), 1);
}

#[tokio::test]
async fn test_failed_restore_is_retried_when_enabled() {
    let channel = RecordingChannel::default();
    channel.fail_restore.store(true, Ordering::SeqCst);
    let state = Arc::new(ModerationState::new());
    let channel = Arc::new(channel);
    let reconciler = Reconciler::new(state.clone(), channel.clone()).with_restore_retries(true);
    state.group_mutes.mute("g1", "1m", "", t0()).unwrap();

    let report = reconciler.run_expiry_sweep(t0() + mins(1)).await;
    assert_eq!(report.restore_failures, 1);
    assert!(state.group_mutes.record("g1").is_none());
    assert_eq!(reconciler.pending_restores(), vec!["g1".to_string()]);

    // Still failing: stays pending.
    let report = reconciler.run_expiry_sweep(t0() + mins(2)).await;
    assert_eq!(report.restores_retried, 0);
    assert_eq!(reconciler.pending_restores().len(), 1);

    channel.fail_restore.store(false, Ordering::SeqCst);
    let report = reconciler.run_expiry_sweep(t0() + mins(3)).await;
    assert_eq!(report.restores_retried, 1);
    assert!(reconciler.pending_restores().is_empty());
    assert_eq!(channel.announce_calls().len(), 3);
    // The unmute notice went out once, on the first sweep.
    assert_eq!(channel.sent().len(), 1);
}

#[tokio::test]
async fn test_pending_restore_dropped_when_group_is_muted_again() {
    let channel = RecordingChannel::default();
    channel.fail_restore.store(true, Ordering::SeqCst);
    let state = Arc::new(ModerationState::new());
    let channel = Arc::new(channel);
    let reconciler = Reconciler::new(state.clone(), channel.clone()).with_restore_retries(true);
    state.group_mutes.mute("g1", "1m", "", t0()).unwrap();
    reconciler.run_expiry_sweep(t0() + mins(1)).await;
    assert_eq!(reconciler.pending_restores().len(), 1);

    state.group_mutes.mute("g1", "1h", "", t0() + mins(2)).unwrap();
    reconciler.run_expiry_sweep(t0() + mins(3)).await;

    assert!(reconciler.pending_restores().is_empty());
    assert_eq!(channel.announce_calls().len(), 1);
    assert!(state.group_mutes.is_muted("g1", t0() + mins(3)));
}
