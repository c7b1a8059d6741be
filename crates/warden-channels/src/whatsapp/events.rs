//! Bot events: connection state tracking and incoming message forwarding.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wacore::types::events::Event;
use wacore_binary::jid::Jid;
use warden_core::message::IncomingMessage;
use whatsapp_rust::client::Client;

/// State the running bot's event handler shares with the channel.
#[derive(Clone)]
pub(super) struct EventContext {
    pub tx: mpsc::Sender<IncomingMessage>,
    pub allowed_groups: Arc<Vec<String>>,
    pub client: Arc<Mutex<Option<Arc<Client>>>>,
    pub sent_ids: Arc<Mutex<HashSet<String>>>,
}

impl EventContext {
    pub(super) async fn dispatch(self, event: Event, client: Arc<Client>) {
        match event {
            Event::PairingQrCode { .. } => {
                warn!("WhatsApp session is not paired. Run `warden pair` first.");
            }
            Event::Connected(_) => {
                info!("WhatsApp connected");
                *self.client.lock().await = Some(client);
            }
            Event::Disconnected(_) => {
                warn!("WhatsApp disconnected");
                *self.client.lock().await = None;
            }
            Event::LoggedOut(_) => {
                warn!("WhatsApp logged out, run `warden pair` to link again");
                *self.client.lock().await = None;
            }
            Event::Message(msg, info) => {
                handle_whatsapp_message(
                    *msg,
                    info,
                    &self.tx,
                    &self.allowed_groups,
                    &self.sent_ids,
                )
                .await;
            }
            _ => {}
        }
    }
}

/// `user@server` without agent/device parts.
pub(super) fn bare_jid(jid: &Jid) -> String {
    format!("{}@{}", jid.user, jid.server)
}

/// Text plus mention/quote metadata pulled out of a (possibly wrapped) message.
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct ExtractedText {
    pub text: String,
    pub mentions: Vec<String>,
    pub quoted_sender: Option<String>,
}

/// Unwrap nested wrappers and collect text, mentions, and the quoted sender.
pub(super) fn extract_text(msg: &waproto::whatsapp::Message) -> ExtractedText {
    // Unwrap nested wrappers (device_sent, ephemeral, view_once).
    let inner = msg
        .device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| {
            msg.ephemeral_message
                .as_ref()
                .and_then(|e| e.message.as_deref())
        })
        .or_else(|| {
            msg.view_once_message
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
        .unwrap_or(msg);

    if let Some(ref ext) = inner.extended_text_message {
        let (mentions, quoted_sender) = ext
            .context_info
            .as_ref()
            .map(|c| (c.mentioned_jid.clone(), c.participant.clone()))
            .unwrap_or_default();
        return ExtractedText {
            text: ext.text.clone().unwrap_or_default(),
            mentions,
            quoted_sender,
        };
    }

    let text = inner
        .conversation
        .clone()
        .or_else(|| {
            inner
                .image_message
                .as_ref()
                .and_then(|i| i.caption.clone())
        })
        .or_else(|| {
            inner
                .video_message
                .as_ref()
                .and_then(|v| v.caption.clone())
        })
        .unwrap_or_default();

    ExtractedText {
        text,
        ..Default::default()
    }
}

/// Process an incoming WhatsApp message event.
///
/// Only group messages are forwarded; direct chats are ignored.
pub(super) async fn handle_whatsapp_message(
    msg: waproto::whatsapp::Message,
    info: wacore::types::message::MessageInfo,
    tx: &mpsc::Sender<IncomingMessage>,
    allowed_groups: &[String],
    sent_ids: &Arc<Mutex<HashSet<String>>>,
) {
    let is_group = info.source.is_group;
    let chat_jid = info.source.chat.to_string();

    debug!(
        "WA msg: is_group={}, is_from_me={}, sender={}, chat={}",
        is_group, info.source.is_from_me, info.source.sender.user, chat_jid,
    );

    if !is_group {
        debug!("WA filtered: ignoring direct message");
        return;
    }
    if !allowed_groups.is_empty() && !allowed_groups.contains(&chat_jid) {
        debug!("WA filtered: group {chat_jid} not in allowed_groups");
        return;
    }

    let msg_id = info.id.clone();
    if sent_ids.lock().await.remove(&msg_id) {
        debug!("skipping own echo: {msg_id}");
        return;
    }

    let extracted = extract_text(&msg);
    if extracted.text.trim().is_empty() {
        return;
    }

    let sender_id = bare_jid(&info.source.sender);
    let sender_name = if info.push_name.is_empty() {
        None
    } else {
        Some(info.push_name.clone())
    };

    let incoming = IncomingMessage {
        id: Uuid::new_v4(),
        channel: "whatsapp".to_string(),
        platform_id: Some(msg_id),
        sender_id,
        sender_name,
        text: extracted.text,
        timestamp: chrono::Utc::now(),
        reply_target: Some(chat_jid),
        is_group: true,
        from_me: info.source.is_from_me,
        mentions: extracted.mentions,
        quoted_sender: extracted.quoted_sender,
    };

    if tx.send(incoming).await.is_err() {
        info!("whatsapp channel receiver dropped");
    }
}
