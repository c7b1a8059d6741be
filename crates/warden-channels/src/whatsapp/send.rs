//! Outbound message building, chunking, and retry logic.

use tracing::{error, warn};
use wacore_binary::jid::Jid;
use warden_core::error::WardenError;
use whatsapp_rust::client::Client;

/// Longest text body sent in a single message.
pub(super) const MAX_MESSAGE_LEN: usize = 4096;

/// Backoff between send attempts: 500ms, 1s, 2s.
pub(super) const RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 2000];

/// Send with up to three attempts, sleeping between failures.
///
/// Returns the server-assigned message ID so the caller can drop the echo.
pub(super) async fn retry_send(
    client: &Client,
    jid: &Jid,
    msg: waproto::whatsapp::Message,
) -> Result<String, WardenError> {
    let attempts = RETRY_DELAYS_MS.len();
    let mut last_err = None;

    for (attempt, delay_ms) in RETRY_DELAYS_MS.iter().enumerate() {
        match client.send_message(jid.clone(), msg.clone()).await {
            Ok(msg_id) => return Ok(msg_id),
            Err(e) => {
                let attempt_num = attempt + 1;
                if attempt_num < attempts {
                    warn!(
                        "send to {jid} failed ({attempt_num}/{attempts}): {e}, retrying in {delay_ms}ms"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
                } else {
                    error!("send to {jid} failed ({attempt_num}/{attempts}): {e}, giving up");
                }
                last_err = Some(e);
            }
        }
    }

    Err(WardenError::Channel(format!(
        "whatsapp send failed after {attempts} attempts: {}",
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Plain `conversation` body, or an extended text carrying mention JIDs.
pub(super) fn build_text_message(text: &str, mentions: &[String]) -> waproto::whatsapp::Message {
    use waproto::whatsapp::message::ExtendedTextMessage;
    use waproto::whatsapp::ContextInfo;

    if mentions.is_empty() {
        return waproto::whatsapp::Message {
            conversation: Some(text.to_string()),
            ..Default::default()
        };
    }

    waproto::whatsapp::Message {
        extended_text_message: Some(Box::new(ExtendedTextMessage {
            text: Some(text.to_string()),
            context_info: Some(Box::new(ContextInfo {
                mentioned_jid: mentions.to_vec(),
                ..Default::default()
            })),
            ..Default::default()
        })),
        ..Default::default()
    }
}

/// Split text into chunks of at most `max_len` bytes, preferring line breaks.
pub(super) fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // Never emit an empty chunk when a char is wider than `max_len`.
            end = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
        let break_at = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|i| start + i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}
