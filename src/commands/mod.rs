//! Group moderation commands, parsed from chat text and answered in the group.

mod antilink;
mod mutes;
mod status;
mod warnings;


pub use warnings::issue_warning;

use chrono::{DateTime, Utc};
use warden_core::{config::ModerationConfig, message::OutgoingMessage, traits::Channel};
use warden_moderation::ModerationState;

/// Everything a command handler may read or touch.
pub struct CommandContext<'a> {
    pub state: &'a ModerationState,
    pub channel: &'a dyn Channel,
    pub moderation: &'a ModerationConfig,
    pub group_id: &'a str,
    /// First mention, else the sender of the quoted message.
    pub target: Option<&'a str>,
    /// Text after the command word.
    pub args: &'a str,
    /// Group admins. Only fetched for admin-only commands.
    pub admins: &'a [String],
    pub now: DateTime<Utc>,
}

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Warn,
    Warnings,
    ClearWarn,
    MuteGroup,
    UnmuteGroup,
    GroupStatus,
    Mute,
    Unmute,
    Muted,
    Antilink,
    Help,
}

impl Command {
    /// Parse `text` into a command and its argument text.
    ///
    /// Unknown commands and text without one of `prefixes` yield `None`.
    pub fn parse<'t>(text: &'t str, prefixes: &[String]) -> Option<(Self, &'t str)> {
        let text = text.trim_start();
        let first = text.split_whitespace().next()?;
        let name = prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .find_map(|p| first.strip_prefix(p.as_str()))?;
        // Strip @botname suffix (e.g. "/help@warden" → "help").
        let name = name.split('@').next().unwrap_or(name);

        let cmd = match name.to_ascii_lowercase().as_str() {
            "warn" => Self::Warn,
            "warnings" | "warns" => Self::Warnings,
            "clearwarn" | "clearwarns" => Self::ClearWarn,
            "mutegroup" => Self::MuteGroup,
            "unmutegroup" => Self::UnmuteGroup,
            "groupstatus" => Self::GroupStatus,
            "mute" => Self::Mute,
            "unmute" => Self::Unmute,
            "muted" => Self::Muted,
            "antilink" => Self::Antilink,
            "help" => Self::Help,
            _ => return None,
        };
        Some((cmd, text[first.len()..].trim()))
    }

    /// Whether only group admins (and configured owners) may run it.
    pub fn requires_admin(self) -> bool {
        !matches!(
            self,
            Self::Warnings | Self::GroupStatus | Self::Muted | Self::Help
        )
    }
}

/// Argument tokens with `@mention` tags removed.
fn plain_args(args: &str) -> Vec<&str> {
    args.split_whitespace()
        .filter(|token| !token.starts_with('@'))
        .collect()
}

/// Handle a command and return the reply for the group.
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) -> OutgoingMessage {
    match cmd {
        Command::Warn => warnings::handle_warn(ctx).await,
        Command::Warnings => warnings::handle_warnings(ctx),
        Command::ClearWarn => warnings::handle_clear(ctx),
        Command::MuteGroup => mutes::handle_mute_group(ctx).await,
        Command::UnmuteGroup => mutes::handle_unmute_group(ctx).await,
        Command::GroupStatus => status::handle_group_status(ctx),
        Command::Mute => mutes::handle_mute_user(ctx),
        Command::Unmute => mutes::handle_unmute_user(ctx),
        Command::Muted => mutes::handle_muted(ctx),
        Command::Antilink => antilink::handle_antilink(ctx),
        Command::Help => status::handle_help(ctx),
    }
}
