//! Gateway: the main event loop connecting the WhatsApp channel to the
//! moderation state.
//!
//! Runs the expiry sweep on a timer and dispatches incoming group messages
//! to commands and antilink enforcement until Ctrl-C.

mod routing;
mod sweep;


use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use warden_core::{
    config::{AuthConfig, ModerationConfig},
    message::OutgoingMessage,
    traits::Channel,
};
use warden_moderation::{ModerationState, Reconciler};

/// Routes messages between the channel and the moderation engine.
pub struct Gateway {
    pub(super) state: Arc<ModerationState>,
    pub(super) channel: Arc<dyn Channel>,
    pub(super) reconciler: Arc<Reconciler>,
    pub(super) auth_config: AuthConfig,
    pub(super) moderation: ModerationConfig,
}

impl Gateway {
    pub fn new(
        channel: Arc<dyn Channel>,
        auth_config: AuthConfig,
        moderation: ModerationConfig,
    ) -> Self {
        let state = Arc::new(ModerationState::new());
        let reconciler = Arc::new(
            Reconciler::new(state.clone(), channel.clone())
                .with_restore_retries(moderation.retry_failed_restores),
        );
        Self {
            state,
            channel,
            reconciler,
            auth_config,
            moderation,
        }
    }

    /// Run the main event loop.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "Warden gateway running | channel: {} | sweep every {}s | admin-only: {}",
            self.channel.name(),
            self.moderation.sweep_interval_secs,
            self.auth_config.admin_only,
        );

        let channel_name = self.channel.name().to_string();
        let mut rx = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel {channel_name}: {e}"))?;
        info!("Channel started: {channel_name}");

        let sweep_handle = {
            let reconciler = self.reconciler.clone();
            let interval_secs = self.moderation.sweep_interval_secs;
            tokio::spawn(async move {
                Self::sweep_loop(reconciler, interval_secs).await;
            })
        };

        // Main event loop with graceful shutdown.
        loop {
            tokio::select! {
                incoming = rx.recv() => match incoming {
                    Some(incoming) => {
                        let gw = self.clone();
                        tokio::spawn(async move {
                            gw.handle_message(incoming, Utc::now()).await;
                        });
                    }
                    None => {
                        warn!("channel stream closed");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown(&sweep_handle).await;
        Ok(())
    }

    /// Stop the sweep timer and the channel. In-flight sweep calls are abandoned.
    async fn shutdown(&self, sweep_handle: &tokio::task::JoinHandle<()>) {
        info!("Shutting down...");
        sweep_handle.abort();

        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel {}: {e}", self.channel.name());
        }

        info!("Shutdown complete.");
    }

    pub(super) async fn send(&self, msg: OutgoingMessage) {
        if let Err(e) = self.channel.send(msg).await {
            error!("failed to send message: {e}");
        }
    }
}
