use super::CommandContext;
use tracing::info;
use warden_core::message::OutgoingMessage;

pub(super) fn handle_antilink(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let registry = &ctx.state.antilink;
    let action = ctx
        .args
        .split_whitespace()
        .next()
        .unwrap_or("status")
        .to_ascii_lowercase();

    let text = match action.as_str() {
        "on" | "enable" => {
            if registry.enable(ctx.group_id) {
                info!("antilink enabled in {}", ctx.group_id);
                "🔗 Antilink enabled. Links from non-admins will be flagged."
            } else {
                "Antilink is already enabled."
            }
        }
        "off" | "disable" => {
            if registry.disable(ctx.group_id) {
                info!("antilink disabled in {}", ctx.group_id);
                "🔗 Antilink disabled."
            } else {
                "Antilink is already disabled."
            }
        }
        "status" => {
            if registry.is_enabled(ctx.group_id) {
                "Antilink is on."
            } else {
                "Antilink is off."
            }
        }
        _ => "Usage: /antilink on|off|status",
    };
    OutgoingMessage::text(ctx.group_id, text)
}
