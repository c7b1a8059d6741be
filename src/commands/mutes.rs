//! Mute commands: /mutegroup, /unmutegroup, /mute, /unmute, /muted.

use super::{plain_args, CommandContext};
use tracing::{info, warn};
use warden_core::message::{mention_tag, OutgoingMessage};
use warden_moderation::{display_remaining, humanize_remaining, mute_deadline};

const DURATION_HELP: &str =
    "Use a number followed by m, h, d or w (e.g. 10m, 2h, 3d, 1w).";

fn invalid_duration(ctx: &CommandContext<'_>, token: &str) -> OutgoingMessage {
    OutgoingMessage::text(
        ctx.group_id,
        format!("Invalid duration \"{token}\". {DURATION_HELP}"),
    )
}

fn with_reason(mut text: String, reason: &str) -> String {
    if !reason.is_empty() {
        text.push_str(&format!("\nReason: {reason}"));
    }
    text
}

/// Lock the group to admins and record the mute.
///
/// Runs under the group lock so the expiry sweep cannot reopen the group
/// between the WhatsApp call and the store update.
pub(super) async fn handle_mute_group(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let args = plain_args(ctx.args);
    let Some((token, rest)) = args.split_first() else {
        return OutgoingMessage::text(
            ctx.group_id,
            format!("Usage: /mutegroup <duration> [reason]\n{DURATION_HELP}"),
        );
    };
    let reason = rest.join(" ");
    if mute_deadline(token, ctx.now).is_err() {
        return invalid_duration(ctx, token);
    }

    let lock = ctx.state.group_lock(ctx.group_id);
    let _guard = lock.lock().await;

    if let Err(e) = ctx.channel.set_group_announce(ctx.group_id, true).await {
        warn!("failed to lock group {}: {e}", ctx.group_id);
        return OutgoingMessage::text(
            ctx.group_id,
            "❌ Could not lock the group. Make sure I am a group admin.",
        );
    }

    let end_time = match ctx
        .state
        .group_mutes
        .mute(ctx.group_id, token, &reason, ctx.now)
    {
        Ok(end_time) => end_time,
        Err(_) => return invalid_duration(ctx, token),
    };
    let remaining = humanize_remaining((end_time - ctx.now).num_milliseconds());
    info!("group {} muted until {end_time}", ctx.group_id);

    OutgoingMessage::text(
        ctx.group_id,
        with_reason(
            format!(
                "🔇 Group muted for {}. Only admins can send messages.",
                display_remaining(&remaining)
            ),
            &reason,
        ),
    )
}

/// Drop the mute record and reopen the group.
///
/// The reopen call is made even without a record, so an admin can retry
/// after a failed restore.
pub(super) async fn handle_unmute_group(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let lock = ctx.state.group_lock(ctx.group_id);
    let _guard = lock.lock().await;

    let was_muted = ctx.state.group_mutes.unmute(ctx.group_id);
    if let Err(e) = ctx.channel.set_group_announce(ctx.group_id, false).await {
        warn!("failed to reopen group {}: {e}", ctx.group_id);
        return OutgoingMessage::text(
            ctx.group_id,
            "❌ Could not reopen the group. Make sure I am a group admin.",
        );
    }

    info!("group {} unmuted (had mute: {was_muted})", ctx.group_id);
    let text = if was_muted {
        "🔊 Group unmuted. Everyone can send messages again."
    } else {
        "🔊 The group was not muted. It is open to everyone."
    };
    OutgoingMessage::text(ctx.group_id, text)
}

pub(super) fn handle_mute_user(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let usage = || {
        OutgoingMessage::text(
            ctx.group_id,
            format!("Usage: /mute @user <duration> [reason]\n{DURATION_HELP}"),
        )
    };
    let Some(target) = ctx.target else {
        return usage();
    };
    let args = plain_args(ctx.args);
    let Some((token, rest)) = args.split_first() else {
        return usage();
    };
    if ctx.admins.iter().any(|a| a == target) {
        return OutgoingMessage::text(ctx.group_id, "Admins cannot be muted.");
    }

    let reason = rest.join(" ");
    let end_time = match ctx
        .state
        .user_mutes
        .mute(ctx.group_id, target, token, &reason, ctx.now)
    {
        Ok(end_time) => end_time,
        Err(_) => return invalid_duration(ctx, token),
    };
    let remaining = humanize_remaining((end_time - ctx.now).num_milliseconds());
    info!("{target} muted in {} until {end_time}", ctx.group_id);

    let text = with_reason(
        format!(
            "🔇 {} is muted for {}.",
            mention_tag(target),
            display_remaining(&remaining)
        ),
        &reason,
    );
    OutgoingMessage::with_mentions(ctx.group_id, text, vec![target.to_string()])
}

pub(super) fn handle_unmute_user(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let Some(target) = ctx.target else {
        return OutgoingMessage::text(ctx.group_id, "Usage: /unmute @user");
    };

    let tag = mention_tag(target);
    let text = if ctx.state.user_mutes.unmute(ctx.group_id, target) {
        info!("{target} unmuted in {}", ctx.group_id);
        format!("🔊 {tag} can talk again.")
    } else {
        format!("{tag} is not muted.")
    };
    OutgoingMessage::with_mentions(ctx.group_id, text, vec![target.to_string()])
}

pub(super) fn handle_muted(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let muted = ctx.state.user_mutes.muted_users(ctx.group_id, ctx.now);
    if muted.is_empty() {
        return OutgoingMessage::text(ctx.group_id, "No one is muted in this group.");
    }

    let mut text = String::from("🔇 Muted users:");
    for user in &muted {
        text.push_str(&format!(
            "\n{}: {}",
            mention_tag(&user.user_id),
            display_remaining(&user.remaining)
        ));
        if !user.reason.is_empty() {
            text.push_str(&format!(" ({})", user.reason));
        }
    }
    let users = muted.into_iter().map(|user| user.user_id).collect();
    OutgoingMessage::with_mentions(ctx.group_id, text, users)
}
