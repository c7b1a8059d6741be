//! Warning commands: /warn, /warnings, /clearwarn.

use super::{plain_args, CommandContext};
use tracing::{info, warn};
use warden_core::{
    config::ModerationConfig,
    message::{mention_tag, OutgoingMessage},
    traits::Channel,
};
use warden_moderation::ModerationState;

/// Add a warning for `user_id` and apply the limit action if it is reached.
///
/// Shared by `/warn` and antilink enforcement. A successful kick clears the
/// user's warnings.
pub async fn issue_warning(
    state: &ModerationState,
    channel: &dyn Channel,
    moderation: &ModerationConfig,
    group_id: &str,
    user_id: &str,
    reason: &str,
) -> OutgoingMessage {
    let count = state.warnings.add_warning(group_id, user_id);
    let limit = moderation.max_warnings;
    let tag = mention_tag(user_id);
    info!("warned {user_id} in {group_id} ({count}/{limit})");

    let mut text = if limit > 0 {
        format!("⚠️ {tag} has been warned ({count}/{limit}).")
    } else {
        format!("⚠️ {tag} has been warned ({count}).")
    };
    if !reason.is_empty() {
        text.push_str(&format!("\nReason: {reason}"));
    }

    if limit > 0 && count >= limit {
        if moderation.kick_on_max_warnings {
            match channel.remove_participant(group_id, user_id).await {
                Ok(()) => {
                    state.warnings.clear_warnings(group_id, user_id);
                    info!("removed {user_id} from {group_id} after {count} warnings");
                    text.push_str("\nWarning limit reached: removed from the group.");
                }
                Err(e) => {
                    warn!("failed to remove {user_id} from {group_id}: {e}");
                    text.push_str(
                        "\nWarning limit reached, but I could not remove them. Am I a group admin?",
                    );
                }
            }
        } else {
            text.push_str("\nWarning limit reached.");
        }
    }

    OutgoingMessage::with_mentions(group_id, text, vec![user_id.to_string()])
}

pub(super) async fn handle_warn(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let Some(target) = ctx.target else {
        return OutgoingMessage::text(
            ctx.group_id,
            "Usage: /warn @user [reason] (or reply to their message)",
        );
    };
    if ctx.admins.iter().any(|a| a == target) {
        return OutgoingMessage::text(ctx.group_id, "Admins cannot be warned.");
    }

    let reason = plain_args(ctx.args).join(" ");
    issue_warning(
        ctx.state,
        ctx.channel,
        ctx.moderation,
        ctx.group_id,
        target,
        &reason,
    )
    .await
}

pub(super) fn handle_warnings(ctx: &CommandContext<'_>) -> OutgoingMessage {
    if let Some(target) = ctx.target {
        let count = ctx.state.warnings.get_warnings(ctx.group_id, target);
        let text = format!(
            "{} has {count} warning{}.",
            mention_tag(target),
            if count == 1 { "" } else { "s" }
        );
        return OutgoingMessage::with_mentions(ctx.group_id, text, vec![target.to_string()]);
    }

    let entries = ctx.state.warnings.warnings_for_group(ctx.group_id);
    if entries.is_empty() {
        return OutgoingMessage::text(ctx.group_id, "No warnings in this group.");
    }

    let mut text = String::from("⚠️ Warnings in this group:");
    for (user, count) in &entries {
        text.push_str(&format!("\n{}: {count}", mention_tag(user)));
    }
    let users = entries.into_iter().map(|(user, _)| user).collect();
    OutgoingMessage::with_mentions(ctx.group_id, text, users)
}

pub(super) fn handle_clear(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let Some(target) = ctx.target else {
        return OutgoingMessage::text(ctx.group_id, "Usage: /clearwarn @user");
    };

    let tag = mention_tag(target);
    let text = if ctx.state.warnings.clear_warnings(ctx.group_id, target) {
        format!("✅ Warnings cleared for {tag}.")
    } else {
        format!("{tag} has no warnings.")
    };
    OutgoingMessage::with_mentions(ctx.group_id, text, vec![target.to_string()])
}
