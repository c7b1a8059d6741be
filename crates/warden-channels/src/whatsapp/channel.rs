//! Channel trait implementation for WhatsApp.

use super::send::{build_text_message, retry_send, split_message, MAX_MESSAGE_LEN};
use super::WhatsAppChannel;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;
use wacore_binary::jid::Jid;
use warden_core::{
    error::WardenError,
    message::{IncomingMessage, OutgoingMessage},
    traits::Channel,
};

impl WhatsAppChannel {
    /// Send text to a JID, attaching `mentions` to every chunk.
    async fn send_text(
        &self,
        jid_str: &str,
        text: &str,
        mentions: &[String],
    ) -> Result<(), WardenError> {
        let client = self.connected_client().await?;
        let jid: Jid = jid_str
            .parse()
            .map_err(|e| WardenError::Channel(format!("invalid whatsapp JID '{jid_str}': {e}")))?;

        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let msg = build_text_message(chunk, mentions);
            let msg_id = retry_send(&client, &jid, msg).await?;
            self.sent_ids.lock().await.insert(msg_id);
        }

        Ok(())
    }
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, WardenError> {
        let (tx, rx) = mpsc::channel(64);
        self.build_and_run_bot(tx).await?;
        info!("WhatsApp channel started");
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), WardenError> {
        let target = message
            .reply_target
            .as_deref()
            .ok_or_else(|| WardenError::Channel("no reply_target on outgoing message".into()))?;

        self.send_text(target, &message.text, &message.mentions).await
    }

    async fn set_group_announce(&self, group_id: &str, announce: bool) -> Result<(), WardenError> {
        self.set_announce_impl(group_id, announce).await
    }

    async fn group_admins(&self, group_id: &str) -> Result<Vec<String>, WardenError> {
        self.group_admins_impl(group_id).await
    }

    async fn remove_participant(&self, group_id: &str, user_id: &str) -> Result<(), WardenError> {
        self.remove_participant_impl(group_id, user_id).await
    }

    async fn stop(&self) -> Result<(), WardenError> {
        info!("WhatsApp channel stopped");
        *self.client.lock().await = None;
        Ok(())
    }
}
