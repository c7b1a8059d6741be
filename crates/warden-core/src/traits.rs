use crate::{
    error::WardenError,
    message::{IncomingMessage, OutgoingMessage},
};
use async_trait::async_trait;

/// Messaging transport.
///
/// A messaging platform implements this trait to deliver incoming messages
/// and to carry out the group side effects moderation needs.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    /// Returns a receiver that yields incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, WardenError>;

    /// Send a message (optionally with mentions) to `message.reply_target`.
    async fn send(&self, message: OutgoingMessage) -> Result<(), WardenError>;

    /// Switch a group's "only admins can send" setting.
    ///
    /// `announce = false` restores the group to open.
    async fn set_group_announce(&self, group_id: &str, _announce: bool) -> Result<(), WardenError> {
        Err(WardenError::Channel(format!(
            "{}: group settings not supported (group {group_id})",
            self.name()
        )))
    }

    /// JIDs of the group's admins and super-admins.
    async fn group_admins(&self, _group_id: &str) -> Result<Vec<String>, WardenError> {
        Ok(Vec::new())
    }

    /// Remove a participant from a group.
    async fn remove_participant(&self, group_id: &str, _user_id: &str) -> Result<(), WardenError> {
        Err(WardenError::Channel(format!(
            "{}: participant removal not supported (group {group_id})",
            self.name()
        )))
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), WardenError>;
}
