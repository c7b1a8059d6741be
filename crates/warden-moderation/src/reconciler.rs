//! Expiry sweep: brings WhatsApp group settings back in line with mute state.
//!
//! One sweep:
//! 1. (opt-in) retries reopen calls that failed on earlier sweeps,
//! 2. for every expired group mute: reopen the group, drop the record, announce it,
//! 3. for every expired user mute: drop the record, mention the user.
//!
//! Internal state is cleared even when the WhatsApp call fails. With
//! `with_restore_retries(true)` the failed reopen is retried on later sweeps.

use crate::mutes::MuteRecord;
use crate::state::ModerationState;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use warden_core::message::{mention_tag, OutgoingMessage};
use warden_core::traits::Channel;

pub const GROUP_UNMUTED_NOTICE: &str =
    "🔊 The group mute has expired. Everyone can send messages again.";

fn user_unmuted_notice(user_id: &str) -> String {
    format!(
        "🔊 {} your mute has expired. You can talk in this group again.",
        mention_tag(user_id)
    )
}

/// Counters describing what one sweep did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Another sweep was still running; nothing was done.
    pub skipped: bool,
    pub groups_unmuted: usize,
    pub users_unmuted: usize,
    /// Expired records replaced by a fresh mute before they could be cleared.
    pub superseded: usize,
    pub restore_failures: usize,
    pub notify_failures: usize,
    /// Earlier failed reopen calls that succeeded this time.
    pub restores_retried: usize,
}

impl SweepReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        self.groups_unmuted == 0
            && self.users_unmuted == 0
            && self.superseded == 0
            && self.restores_retried == 0
    }
}

#[derive(Debug)]
enum Outcome {
    Unmuted {
        restore_failed: bool,
        notify_failed: bool,
    },
    Superseded,
}

/// Runs expiry sweeps over a [`ModerationState`] against one [`Channel`].
pub struct Reconciler {
    state: Arc<ModerationState>,
    channel: Arc<dyn Channel>,
    retry_failed_restores: bool,
    /// Groups whose reopen call failed and should be retried.
    pending_restores: Mutex<HashSet<String>>,
    /// Held for the duration of a sweep.
    in_flight: tokio::sync::Mutex<()>,
}

impl Reconciler {
    pub fn new(state: Arc<ModerationState>, channel: Arc<dyn Channel>) -> Self {
        Self {
            state,
            channel,
            retry_failed_restores: false,
            pending_restores: Mutex::new(HashSet::new()),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Keep groups whose reopen call failed and retry them on later sweeps.
    pub fn with_restore_retries(mut self, enabled: bool) -> Self {
        self.retry_failed_restores = enabled;
        self
    }

    /// Groups waiting for a reopen retry.
    pub fn pending_restores(&self) -> Vec<String> {
        let mut groups: Vec<String> = self
            .pending_restores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        groups.sort();
        groups
    }

    /// Run one sweep as of `now`.
    ///
    /// Returns immediately with `skipped` set if a sweep is already running.
    pub async fn run_expiry_sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let Ok(_in_flight) = self.in_flight.try_lock() else {
            debug!("sweep: previous sweep still running, skipping");
            return SweepReport::skipped();
        };

        let mut report = SweepReport::default();

        if self.retry_failed_restores {
            self.retry_pending_restores(&mut report).await;
        }

        // Groups first.
        let mut tasks = JoinSet::new();
        for (group_id, record) in self.state.group_mutes.expired(now) {
            let state = self.state.clone();
            let channel = self.channel.clone();
            tasks.spawn(async move {
                let outcome = expire_group(&state, channel.as_ref(), &group_id, &record).await;
                (group_id, outcome)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((group_id, outcome)) => {
                    if matches!(
                        outcome,
                        Outcome::Unmuted {
                            restore_failed: true,
                            ..
                        }
                    ) && self.retry_failed_restores
                    {
                        self.pending_restores
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .insert(group_id);
                    }
                    tally(&mut report, outcome, true);
                }
                Err(e) => error!("sweep: group expiry task failed: {e}"),
            }
        }

        // Then users.
        let mut tasks = JoinSet::new();
        for (group_id, user_id, record) in self.state.user_mutes.expired(now) {
            let state = self.state.clone();
            let channel = self.channel.clone();
            tasks.spawn(async move {
                expire_user(&state, channel.as_ref(), &group_id, &user_id, &record).await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => tally(&mut report, outcome, false),
                Err(e) => error!("sweep: user expiry task failed: {e}"),
            }
        }

        if !report.is_idle() {
            info!(
                "sweep: {} group(s) and {} user(s) unmuted, {} superseded, {} restore failure(s), {} notify failure(s)",
                report.groups_unmuted,
                report.users_unmuted,
                report.superseded,
                report.restore_failures,
                report.notify_failures,
            );
        }
        report
    }

    async fn retry_pending_restores(&self, report: &mut SweepReport) {
        for group_id in self.pending_restores() {
            let lock = self.state.group_lock(&group_id);
            let _guard = lock.lock().await;

            // A newer mute owns the group setting now. If it has expired too,
            // the group pass below reopens the group.
            if self.state.group_mutes.record(&group_id).is_some() {
                self.forget_pending(&group_id);
                continue;
            }

            match self.channel.set_group_announce(&group_id, false).await {
                Ok(()) => {
                    info!("sweep: reopened {group_id} on retry");
                    self.forget_pending(&group_id);
                    report.restores_retried += 1;
                }
                Err(e) => warn!("sweep: retry to reopen {group_id} failed again: {e}"),
            }
        }
    }

    fn forget_pending(&self, group_id: &str) {
        self.pending_restores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(group_id);
    }
}

fn tally(report: &mut SweepReport, outcome: Outcome, group: bool) {
    match outcome {
        Outcome::Unmuted {
            restore_failed,
            notify_failed,
        } => {
            if group {
                report.groups_unmuted += 1;
            } else {
                report.users_unmuted += 1;
            }
            report.restore_failures += usize::from(restore_failed);
            report.notify_failures += usize::from(notify_failed);
        }
        Outcome::Superseded => report.superseded += 1,
    }
}

async fn expire_group(
    state: &ModerationState,
    channel: &dyn Channel,
    group_id: &str,
    expired: &MuteRecord,
) -> Outcome {
    let lock = state.group_lock(group_id);
    let _guard = lock.lock().await;

    // Re-check under the lock: the snapshot may be stale.
    if state.group_mutes.record(group_id).map(|r| r.end_time) != Some(expired.end_time) {
        debug!("sweep: mute on {group_id} was replaced, leaving it");
        return Outcome::Superseded;
    }

    let restore_failed = match channel.set_group_announce(group_id, false).await {
        Ok(()) => false,
        Err(e) => {
            warn!("sweep: failed to reopen {group_id}: {e}");
            true
        }
    };

    if !state.group_mutes.remove_if_unchanged(group_id, expired.end_time) {
        debug!("sweep: {group_id} was muted again during the reopen call, leaving it");
        return Outcome::Superseded;
    }
    info!("sweep: group mute on {group_id} expired");

    let notify_failed = match channel
        .send(OutgoingMessage::text(group_id, GROUP_UNMUTED_NOTICE))
        .await
    {
        Ok(()) => false,
        Err(e) => {
            warn!("sweep: failed to announce unmute in {group_id}: {e}");
            true
        }
    };

    Outcome::Unmuted {
        restore_failed,
        notify_failed,
    }
}

async fn expire_user(
    state: &ModerationState,
    channel: &dyn Channel,
    group_id: &str,
    user_id: &str,
    expired: &MuteRecord,
) -> Outcome {
    if !state
        .user_mutes
        .remove_if_unchanged(group_id, user_id, expired.end_time)
    {
        debug!("sweep: mute on {user_id} in {group_id} was replaced, leaving it");
        return Outcome::Superseded;
    }
    info!("sweep: mute on {user_id} in {group_id} expired");

    let msg = OutgoingMessage::with_mentions(
        group_id,
        user_unmuted_notice(user_id),
        vec![user_id.to_string()],
    );
    let notify_failed = match channel.send(msg).await {
        Ok(()) => false,
        Err(e) => {
            warn!("sweep: failed to notify {user_id} in {group_id}: {e}");
            true
        }
    };

    Outcome::Unmuted {
        restore_failed: false,
        notify_failed,
    }
}

#[cfg(test)]
mod tests;
