//! Terminal QR rendering and the standalone pairing flow.

use super::bot::{device_name, open_store};
use super::session_db_path;
use tokio::sync::mpsc;
use wacore::types::events::Event;
use waproto::whatsapp::device_props::PlatformType;
use warden_core::error::WardenError;
use whatsapp_rust::bot::Bot;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

/// Render a QR code with Unicode half blocks, two module rows per text line.
pub fn generate_qr_terminal(qr_data: &str) -> Result<String, WardenError> {
    use qrcode::{Color, EcLevel, QrCode};

    let code = QrCode::with_error_correction_level(qr_data.as_bytes(), EcLevel::L)
        .map_err(|e| WardenError::Channel(format!("QR generation failed: {e}")))?;

    let width = code.width();
    let colors = code.into_colors();
    let dark = |row: usize, col: usize| row < width && colors[row * width + col] == Color::Dark;

    let mut out = String::with_capacity((width + 1) * width.div_ceil(2));
    for row in (0..width).step_by(2) {
        for col in 0..width {
            out.push(match (dark(row, col), dark(row + 1, col)) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push('\n');
    }

    Ok(out)
}

/// Link this process as a new device.
///
/// The first receiver yields QR payloads as WhatsApp rotates them; the
/// second fires once the session is paired and connected.
pub async fn start_pairing(
    data_dir: &str,
    configured_name: Option<String>,
) -> Result<(mpsc::Receiver<String>, mpsc::Receiver<bool>), WardenError> {
    let (qr_tx, qr_rx) = mpsc::channel::<String>(4);
    let (done_tx, done_rx) = mpsc::channel::<bool>(1);

    let backend = open_store(&session_db_path(data_dir)?).await?;

    let mut bot = Bot::builder()
        .with_backend(backend)
        .with_transport_factory(TokioWebSocketTransportFactory::new())
        .with_http_client(UreqHttpClient::new())
        .with_device_props(
            Some(device_name(configured_name)),
            None,
            Some(PlatformType::Desktop),
        )
        .on_event(move |event, _client| {
            let qr_tx = qr_tx.clone();
            let done_tx = done_tx.clone();
            async move {
                match event {
                    Event::PairingQrCode { code, .. } => {
                        let _ = qr_tx.send(code).await;
                    }
                    Event::PairSuccess(_) | Event::Connected(_) => {
                        let _ = done_tx.send(true).await;
                    }
                    _ => {}
                }
            }
        })
        .build()
        .await
        .map_err(|e| WardenError::Channel(format!("whatsapp pairing build failed: {e}")))?;

    let _handle = bot
        .run()
        .await
        .map_err(|e| WardenError::Channel(format!("whatsapp pairing run failed: {e}")))?;

    Ok((qr_rx, done_rx))
}
