//! Group and user mute records with lazy expiry.
//!
//! A stored record is not proof of an active mute. Every read goes through
//! [`get_if_live`], which compares the deadline against the caller's `now`
//! and deletes the record when it has passed.

use crate::duration::{humanize_remaining, parse_duration_ms};
use chrono::{DateTime, TimeDelta, Utc};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use warden_core::error::WardenError;

/// A stored mute: deadline plus the reason given when it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteRecord {
    pub end_time: DateTime<Utc>,
    pub reason: String,
}

impl MuteRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }

    fn info(&self, now: DateTime<Utc>) -> MuteInfo {
        MuteInfo {
            end_time: self.end_time,
            remaining: humanize_remaining((self.end_time - now).num_milliseconds()),
            reason: self.reason.clone(),
        }
    }
}

/// Read view of a live mute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteInfo {
    pub end_time: DateTime<Utc>,
    /// Humanized remaining time (`"2h 5m"`); empty under a minute.
    pub remaining: String,
    pub reason: String,
}

/// One entry of a group's muted-user listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutedUser {
    pub user_id: String,
    pub remaining: String,
    pub reason: String,
}

/// Deadline for a mute of `token` starting at `now`. Zero-length mutes are rejected.
pub fn mute_deadline(token: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, WardenError> {
    let invalid = || WardenError::InvalidDuration(token.to_string());
    let ms = parse_duration_ms(token)
        .filter(|ms| *ms > 0)
        .ok_or_else(invalid)?;
    let delta = i64::try_from(ms)
        .ok()
        .and_then(TimeDelta::try_milliseconds)
        .ok_or_else(invalid)?;
    now.checked_add_signed(delta).ok_or_else(invalid)
}

/// Look up `key`, evicting the record if its deadline has passed.
fn get_if_live<K, Q>(
    map: &mut HashMap<K, MuteRecord>,
    key: &Q,
    now: DateTime<Utc>,
) -> Option<MuteRecord>
where
    K: Borrow<Q> + Hash + Eq,
    Q: Hash + Eq + ?Sized,
{
    if map.get(key)?.is_expired(now) {
        map.remove(key);
        return None;
    }
    map.get(key).cloned()
}

/// Remove `key` only if it still carries `end_time`.
///
/// The sweep snapshots expired records and removes them later; a fresh mute
/// installed in between has a different deadline and survives.
fn remove_if_unchanged<K, Q>(
    map: &mut HashMap<K, MuteRecord>,
    key: &Q,
    end_time: DateTime<Utc>,
) -> bool
where
    K: Borrow<Q> + Hash + Eq,
    Q: Hash + Eq + ?Sized,
{
    if map.get(key).is_some_and(|r| r.end_time == end_time) {
        map.remove(key);
        true
    } else {
        false
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Group mutes
// ---------------------------------------------------------------------------

/// At most one mute per group. A new mute overwrites the old one.
#[derive(Debug, Default)]
pub struct GroupMuteStore {
    records: Mutex<HashMap<String, MuteRecord>>,
}

impl GroupMuteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mute `group_id` for `token` (`10m`, `2h`, ...). Returns the deadline.
    ///
    /// An invalid token leaves the store untouched.
    pub fn mute(
        &self,
        group_id: &str,
        token: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, WardenError> {
        let end_time = mute_deadline(token, now)?;
        lock(&self.records).insert(
            group_id.to_string(),
            MuteRecord {
                end_time,
                reason: reason.to_string(),
            },
        );
        Ok(end_time)
    }

    /// Remove the group's mute. Returns whether a record existed.
    pub fn unmute(&self, group_id: &str) -> bool {
        lock(&self.records).remove(group_id).is_some()
    }

    pub fn is_muted(&self, group_id: &str, now: DateTime<Utc>) -> bool {
        get_if_live(&mut lock(&self.records), group_id, now).is_some()
    }

    pub fn info(&self, group_id: &str, now: DateTime<Utc>) -> Option<MuteInfo> {
        get_if_live(&mut lock(&self.records), group_id, now).map(|r| r.info(now))
    }

    /// Snapshot of records whose deadline is at or before `now`. Nothing is removed.
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<(String, MuteRecord)> {
        lock(&self.records)
            .iter()
            .filter(|(_, r)| r.is_expired(now))
            .map(|(g, r)| (g.clone(), r.clone()))
            .collect()
    }

    /// Raw record, expired or not.
    pub fn record(&self, group_id: &str) -> Option<MuteRecord> {
        lock(&self.records).get(group_id).cloned()
    }

    pub fn remove_if_unchanged(&self, group_id: &str, end_time: DateTime<Utc>) -> bool {
        remove_if_unchanged(&mut lock(&self.records), group_id, end_time)
    }
}

// ---------------------------------------------------------------------------
// User mutes
// ---------------------------------------------------------------------------

/// Mutes keyed by group, then user. Empty per-group maps are pruned.
#[derive(Debug, Default)]
pub struct UserMuteStore {
    groups: Mutex<HashMap<String, HashMap<String, MuteRecord>>>,
}

impl UserMuteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the group's user map, dropping the map if `f` leaves it empty.
    fn with_group<R>(
        &self,
        group_id: &str,
        f: impl FnOnce(&mut HashMap<String, MuteRecord>) -> R,
    ) -> Option<R> {
        let mut groups = lock(&self.groups);
        let users = groups.get_mut(group_id)?;
        let out = f(users);
        if users.is_empty() {
            groups.remove(group_id);
        }
        Some(out)
    }

    pub fn mute(
        &self,
        group_id: &str,
        user_id: &str,
        token: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, WardenError> {
        let end_time = mute_deadline(token, now)?;
        lock(&self.groups)
            .entry(group_id.to_string())
            .or_default()
            .insert(
                user_id.to_string(),
                MuteRecord {
                    end_time,
                    reason: reason.to_string(),
                },
            );
        Ok(end_time)
    }

    pub fn unmute(&self, group_id: &str, user_id: &str) -> bool {
        self.with_group(group_id, |users| users.remove(user_id).is_some())
            .unwrap_or(false)
    }

    pub fn is_muted(&self, group_id: &str, user_id: &str, now: DateTime<Utc>) -> bool {
        self.with_group(group_id, |users| get_if_live(users, user_id, now))
            .flatten()
            .is_some()
    }

    pub fn info(&self, group_id: &str, user_id: &str, now: DateTime<Utc>) -> Option<MuteInfo> {
        self.with_group(group_id, |users| get_if_live(users, user_id, now))
            .flatten()
            .map(|r| r.info(now))
    }

    /// Live mutes in a group, soonest to expire first. Expired entries are evicted.
    pub fn muted_users(&self, group_id: &str, now: DateTime<Utc>) -> Vec<MutedUser> {
        let mut live: Vec<(String, MuteRecord)> = self
            .with_group(group_id, |users| {
                users.retain(|_, r| !r.is_expired(now));
                users.iter().map(|(u, r)| (u.clone(), r.clone())).collect()
            })
            .unwrap_or_default();
        live.sort_by(|a, b| a.1.end_time.cmp(&b.1.end_time).then_with(|| a.0.cmp(&b.0)));
        live.into_iter()
            .map(|(user_id, r)| {
                let info = r.info(now);
                MutedUser {
                    user_id,
                    remaining: info.remaining,
                    reason: info.reason,
                }
            })
            .collect()
    }

    /// Snapshot of `(group, user, record)` whose deadline has passed. Nothing is removed.
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<(String, String, MuteRecord)> {
        lock(&self.groups)
            .iter()
            .flat_map(|(g, users)| {
                users
                    .iter()
                    .filter(|(_, r)| r.is_expired(now))
                    .map(move |(u, r)| (g.clone(), u.clone(), r.clone()))
            })
            .collect()
    }

    pub fn remove_if_unchanged(
        &self,
        group_id: &str,
        user_id: &str,
        end_time: DateTime<Utc>,
    ) -> bool {
        self.with_group(group_id, |users| {
            remove_if_unchanged(users, user_id, end_time)
        })
        .unwrap_or(false)
    }

    /// Number of groups holding at least one record.
    pub fn group_count(&self) -> usize {
        lock(&self.groups).len()
    }
}
