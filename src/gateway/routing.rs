//! Per-message flow: gating, antilink enforcement, admin checks, and
//! command dispatch.

use super::Gateway;
use crate::commands::{self, Command, CommandContext};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use warden_core::message::{mention_tag, IncomingMessage, OutgoingMessage};
use warden_moderation::contains_link;

impl Gateway {
    /// Handle one incoming message at `now`.
    pub(super) async fn handle_message(&self, incoming: IncomingMessage, now: DateTime<Utc>) {
        if incoming.from_me {
            return;
        }
        let Some(group_id) = incoming.group_id() else {
            debug!("ignoring non-group message from {}", incoming.sender_id);
            return;
        };
        let sender = incoming.sender_id.as_str();

        // Muted users are not served until the mute ends.
        if self.state.user_mutes.is_muted(group_id, sender, now) {
            debug!("ignoring muted {sender} in {group_id}");
            return;
        }

        let Some((cmd, args)) =
            Command::parse(&incoming.text, &self.moderation.command_prefixes)
        else {
            self.enforce_antilink(group_id, sender, &incoming.text).await;
            return;
        };

        let admins = if cmd.requires_admin() {
            let admins = self.group_admins(group_id).await;
            if self.auth_config.admin_only && !self.is_privileged(sender, &admins) {
                info!("denied {cmd:?} from non-admin {sender} in {group_id}");
                self.send(OutgoingMessage::text(
                    group_id,
                    self.auth_config.deny_message.as_str(),
                ))
                .await;
                return;
            }
            admins
        } else {
            Vec::new()
        };

        info!("[{group_id}] {cmd:?} from {sender}");
        let ctx = CommandContext {
            state: &self.state,
            channel: self.channel.as_ref(),
            moderation: &self.moderation,
            group_id,
            target: incoming.target_user(),
            args,
            admins: &admins,
            now,
        };
        let reply = commands::handle(cmd, &ctx).await;
        self.send(reply).await;
    }

    /// Warn (or just tell off) a non-admin who posts a link in an antilink group.
    async fn enforce_antilink(&self, group_id: &str, sender: &str, text: &str) {
        if !self.state.antilink.is_enabled(group_id) || !contains_link(text) {
            return;
        }
        if self.is_owner(sender) {
            return;
        }
        let admins = self.group_admins(group_id).await;
        if admins.iter().any(|a| a == sender) {
            return;
        }

        info!("antilink: link from {sender} in {group_id}");
        let reply = if self.moderation.antilink_warns {
            commands::issue_warning(
                &self.state,
                self.channel.as_ref(),
                &self.moderation,
                group_id,
                sender,
                "posting links",
            )
            .await
        } else {
            OutgoingMessage::with_mentions(
                group_id,
                format!("🔗 {} links are not allowed here.", mention_tag(sender)),
                vec![sender.to_string()],
            )
        };
        self.send(reply).await;
    }

    /// Admin JIDs of the group. A failed lookup counts as "no admins".
    async fn group_admins(&self, group_id: &str) -> Vec<String> {
        match self.channel.group_admins(group_id).await {
            Ok(admins) => admins,
            Err(e) => {
                warn!("failed to fetch admins of {group_id}: {e}");
                Vec::new()
            }
        }
    }

    /// Configured owner, matched by full JID or by phone number.
    pub(super) fn is_owner(&self, sender: &str) -> bool {
        let phone = sender.split('@').next().unwrap_or(sender);
        self.auth_config
            .owners
            .iter()
            .any(|owner| owner == sender || owner.trim_start_matches('+') == phone)
    }

    fn is_privileged(&self, sender: &str, admins: &[String]) -> bool {
        self.is_owner(sender) || admins.iter().any(|a| a == sender)
    }
}
