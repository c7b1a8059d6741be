use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "whatsapp").
    pub channel: String,
    /// Platform message ID, if the transport exposes one.
    #[serde(default)]
    pub platform_id: Option<String>,
    /// Full sender JID (e.g. `5511999887766@s.whatsapp.net`).
    pub sender_id: String,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    /// Message text content.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Chat the message arrived in. For groups this is the group JID.
    #[serde(default)]
    pub reply_target: Option<String>,
    /// Whether this message comes from a group chat.
    #[serde(default)]
    pub is_group: bool,
    /// Whether the message was sent by the bot's own account.
    #[serde(default)]
    pub from_me: bool,
    /// JIDs mentioned with `@` in the message.
    #[serde(default)]
    pub mentions: Vec<String>,
    /// Sender of the message this one replies to, if any.
    #[serde(default)]
    pub quoted_sender: Option<String>,
}

impl IncomingMessage {
    /// The group JID, when the message was sent inside a group.
    pub fn group_id(&self) -> Option<&str> {
        if self.is_group {
            self.reply_target.as_deref()
        } else {
            None
        }
    }

    /// The user a moderation command targets: first mention, else the quoted sender.
    pub fn target_user(&self) -> Option<&str> {
        self.mentions
            .first()
            .map(String::as_str)
            .or(self.quoted_sender.as_deref())
    }
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    /// JIDs to mention. The text should carry a matching `@user` tag for each.
    #[serde(default)]
    pub mentions: Vec<String>,
    /// Platform-specific target for routing (group or chat JID).
    #[serde(default)]
    pub reply_target: Option<String>,
}

impl OutgoingMessage {
    /// Plain text message to a chat.
    pub fn text(target: &str, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mentions: Vec::new(),
            reply_target: Some(target.to_string()),
        }
    }

    /// Text message that mentions `users`.
    pub fn with_mentions(target: &str, text: impl Into<String>, users: Vec<String>) -> Self {
        Self {
            text: text.into(),
            mentions: users,
            reply_target: Some(target.to_string()),
        }
    }
}

/// Render the `@user` tag WhatsApp expects for a mention of `jid`.
pub fn mention_tag(jid: &str) -> String {
    let user = jid.split('@').next().unwrap_or(jid);
    // Device suffix ("5511...:12@s.whatsapp.net") is not part of the tag.
    let user = user.split(':').next().unwrap_or(user);
    format!("@{user}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_msg() -> IncomingMessage {
        IncomingMessage {
            id: Uuid::new_v4(),
            channel: "whatsapp".to_string(),
            platform_id: None,
            sender_id: "111@s.whatsapp.net".to_string(),
            sender_name: None,
            text: "/warn".to_string(),
            timestamp: Utc::now(),
            reply_target: Some("120363001234567890@g.us".to_string()),
            is_group: true,
            from_me: false,
            mentions: Vec::new(),
            quoted_sender: None,
        }
    }

    #[test]
    fn test_mention_tag_strips_server_and_device() {
        assert_eq!(mention_tag("5511999887766@s.whatsapp.net"), "@5511999887766");
        assert_eq!(mention_tag("5511999887766:12@s.whatsapp.net"), "@5511999887766");
        assert_eq!(mention_tag("bare"), "@bare");
    }

    #[test]
    fn test_target_user_prefers_mention() {
        let mut msg = group_msg();
        msg.quoted_sender = Some("222@s.whatsapp.net".to_string());
        assert_eq!(msg.target_user(), Some("222@s.whatsapp.net"));
        msg.mentions = vec!["333@s.whatsapp.net".to_string()];
        assert_eq!(msg.target_user(), Some("333@s.whatsapp.net"));
    }

    #[test]
    fn test_group_id_only_for_groups() {
        let mut msg = group_msg();
        assert_eq!(msg.group_id(), Some("120363001234567890@g.us"));
        msg.is_group = false;
        assert_eq!(msg.group_id(), None);
    }
}
