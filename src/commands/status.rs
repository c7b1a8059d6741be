//! Informational commands: /groupstatus, /help.

use super::CommandContext;
use warden_core::message::OutgoingMessage;
use warden_moderation::{display_remaining, humanize_remaining};

pub(super) fn handle_group_status(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let state = ctx.state;
    let mut text = String::from("📋 Group status\n");

    // Raw read: an expired record stays put until the sweep has reopened the group.
    match state.group_mutes.record(ctx.group_id) {
        Some(record) if record.is_expired(ctx.now) => {
            text.push_str("Mute: expired, the group reopens shortly");
        }
        Some(record) => {
            let remaining = humanize_remaining((record.end_time - ctx.now).num_milliseconds());
            text.push_str(&format!("Mute: {} left", display_remaining(&remaining)));
            if !record.reason.is_empty() {
                text.push_str(&format!(" ({})", record.reason));
            }
        }
        None => text.push_str("Mute: off"),
    }

    let antilink = if state.antilink.is_enabled(ctx.group_id) {
        "on"
    } else {
        "off"
    };
    let muted = state.user_mutes.muted_users(ctx.group_id, ctx.now).len();
    let warned = state.warnings.warnings_for_group(ctx.group_id).len();
    text.push_str(&format!(
        "\nAntilink: {antilink}\nMuted users: {muted}\nWarned users: {warned}"
    ));
    if ctx.moderation.max_warnings > 0 {
        text.push_str(&format!(" (limit {})", ctx.moderation.max_warnings));
    }

    OutgoingMessage::text(ctx.group_id, text)
}

pub(super) fn handle_help(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let p = ctx
        .moderation
        .command_prefixes
        .first()
        .map(String::as_str)
        .unwrap_or("/");
    let text = format!(
        "🛡️ Warden commands\n\
         \n\
         Warnings\n\
         {p}warn @user [reason]: add a warning\n\
         {p}warnings [@user]: show warnings\n\
         {p}clearwarn @user: reset warnings\n\
         \n\
         Mutes\n\
         {p}mutegroup <duration> [reason]: only admins can write\n\
         {p}unmutegroup: reopen the group\n\
         {p}mute @user <duration> [reason]: mute a member\n\
         {p}unmute @user\n\
         {p}muted: list muted users\n\
         \n\
         Other\n\
         {p}antilink on|off|status\n\
         {p}groupstatus\n\
         \n\
         Durations: 10m, 2h, 3d, 1w"
    );
    OutgoingMessage::text(ctx.group_id, text)
}
