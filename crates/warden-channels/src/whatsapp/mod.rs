//! WhatsApp channel, pure Rust via `whatsapp-rust`.
//!
//! Uses the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Pairing is done by scanning a QR code, like WhatsApp Web.
//! Session is persisted to `{data_dir}/whatsapp_session/whatsapp.db`.

mod bot;
mod channel;
mod events;
mod groups;
mod qr;
mod send;


pub use qr::{generate_qr_terminal, start_pairing};

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use warden_core::config::WhatsAppConfig;
use warden_core::error::WardenError;

/// WhatsApp channel using the WhatsApp Web protocol.
pub struct WhatsAppChannel {
    pub(super) config: WhatsAppConfig,
    pub(super) data_dir: String,
    /// Client handle for sending messages, set after `start()`.
    pub(super) client: Arc<Mutex<Option<Arc<whatsapp_rust::client::Client>>>>,
    /// Message IDs we sent, used to ignore our own echo.
    pub(super) sent_ids: Arc<Mutex<HashSet<String>>>,
}

impl WhatsAppChannel {
    /// Create a new WhatsApp channel from config.
    pub fn new(config: WhatsAppConfig, data_dir: &str) -> Self {
        Self {
            config,
            data_dir: data_dir.to_string(),
            client: Arc::new(Mutex::new(None)),
            sent_ids: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Get the session database path.
    pub(super) fn session_db_path(&self) -> Result<String, WardenError> {
        session_db_path(&self.data_dir)
    }

    /// Connected client, or a channel error.
    pub(super) async fn connected_client(
        &self,
    ) -> Result<Arc<whatsapp_rust::client::Client>, WardenError> {
        self.client
            .lock()
            .await
            .clone()
            .ok_or_else(|| WardenError::Channel("whatsapp client not connected".into()))
    }
}

/// `{data_dir}/whatsapp_session/whatsapp.db`, creating the directory.
pub(super) fn session_db_path(data_dir: &str) -> Result<String, WardenError> {
    let dir = warden_core::config::shellexpand(data_dir);
    let session_dir = format!("{dir}/whatsapp_session");
    std::fs::create_dir_all(&session_dir)?;
    Ok(format!("{session_dir}/whatsapp.db"))
}

/// Whether a session database from an earlier `warden pair` exists.
pub fn session_exists(data_dir: &str) -> bool {
    let dir = warden_core::config::shellexpand(data_dir);
    std::path::Path::new(&format!("{dir}/whatsapp_session/whatsapp.db")).exists()
}
