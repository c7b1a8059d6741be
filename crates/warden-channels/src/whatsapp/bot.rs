//! Bot lifecycle: building and running the WhatsApp bot.

use super::events::EventContext;
use super::WhatsAppChannel;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use waproto::whatsapp::device_props::PlatformType;
use warden_core::{error::WardenError, message::IncomingMessage};
use whatsapp_rust::bot::Bot;
use whatsapp_rust::store::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

/// Device name shown under "Linked devices" when none is configured.
pub(super) const DEFAULT_DEVICE_NAME: &str = "Warden";

/// Open (or create) the session store at `db_path`.
pub(super) async fn open_store(db_path: &str) -> Result<Arc<SqliteStore>, WardenError> {
    SqliteStore::new(db_path)
        .await
        .map(Arc::new)
        .map_err(|e| WardenError::Channel(format!("whatsapp store init failed: {e}")))
}

pub(super) fn device_name(configured: Option<String>) -> String {
    configured.unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string())
}

impl WhatsAppChannel {
    /// Connect with the stored session and forward group messages to `tx`.
    ///
    /// The bot keeps running in the background after this returns.
    pub(super) async fn build_and_run_bot(
        &self,
        tx: mpsc::Sender<IncomingMessage>,
    ) -> Result<(), WardenError> {
        let db_path = self.session_db_path()?;
        info!("WhatsApp bot building (session: {db_path})...");

        let backend = open_store(&db_path).await?;
        let ctx = EventContext {
            tx,
            allowed_groups: Arc::new(self.config.allowed_groups.clone()),
            client: self.client.clone(),
            sent_ids: self.sent_ids.clone(),
        };

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_device_props(
                Some(device_name(self.config.device_name.clone())),
                None,
                Some(PlatformType::Desktop),
            )
            .on_event(move |event, client| ctx.clone().dispatch(event, client))
            .build()
            .await
            .map_err(|e| WardenError::Channel(format!("whatsapp bot build failed: {e}")))?;

        *self.client.lock().await = Some(bot.client());

        let _handle = bot
            .run()
            .await
            .map_err(|e| WardenError::Channel(format!("whatsapp bot run failed: {e}")))?;

        info!("WhatsApp bot started");
        Ok(())
    }
}
