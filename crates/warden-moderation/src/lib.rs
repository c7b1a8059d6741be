//! # warden-moderation
//!
//! In-memory moderation state for WhatsApp groups and the sweep that
//! reconciles expired mutes with the group settings on WhatsApp.
//!
//! - `duration`: `10m` / `2h` / `3d` / `1w` tokens and remaining-time display
//! - `warnings`: per-group, per-user warning counters
//! - `mutes`: group and user mute records with lazy expiry
//! - `antilink`: per-group antilink flag and the link heuristic
//! - `state`: the `ModerationState` aggregate shared by the bot
//! - `reconciler`: the expiry sweep

pub mod antilink;
pub mod duration;
pub mod mutes;
pub mod reconciler;
pub mod state;
pub mod warnings;

pub use antilink::{contains_link, AntilinkRegistry};
pub use duration::{display_remaining, humanize_remaining, parse_duration_ms};
pub use mutes::{mute_deadline, GroupMuteStore, MuteInfo, MuteRecord, MutedUser, UserMuteStore};
pub use reconciler::{Reconciler, SweepReport};
pub use state::ModerationState;
pub use warnings::WarningLedger;
