//! Interactive `warden pair` flow: show the QR code and wait for the scan.

use std::time::Duration;
use warden_channels::whatsapp;

/// How long to wait for WhatsApp to hand out the first QR code.
const QR_TIMEOUT: Duration = Duration::from_secs(30);
/// How long the user has to scan before the attempt is abandoned.
const SCAN_TIMEOUT: Duration = Duration::from_secs(120);

pub async fn run(data_dir: &str, device_name: Option<String>) -> anyhow::Result<()> {
    cliclack::intro("Warden: WhatsApp pairing")?;

    if whatsapp::session_exists(data_dir) {
        cliclack::log::warning("A session already exists. Pairing again replaces it.")?;
    }
    cliclack::log::info("Open WhatsApp on your phone > Linked Devices > Link a Device")?;

    let (mut qr_rx, mut done_rx) = whatsapp::start_pairing(data_dir, device_name).await?;

    let qr_data = tokio::time::timeout(QR_TIMEOUT, qr_rx.recv())
        .await
        .map_err(|_| anyhow::anyhow!("timed out waiting for QR code"))?
        .ok_or_else(|| anyhow::anyhow!("QR channel closed"))?;
    cliclack::note(
        "Scan this QR code with WhatsApp",
        whatsapp::generate_qr_terminal(&qr_data)?,
    )?;

    let spinner = cliclack::spinner();
    spinner.start("Waiting for scan...");

    // WhatsApp rotates the code while we wait; show each new one.
    let deadline = tokio::time::sleep(SCAN_TIMEOUT);
    tokio::pin!(deadline);
    let paired = loop {
        tokio::select! {
            done = done_rx.recv() => break done.unwrap_or(false),
            Some(code) = qr_rx.recv() => {
                spinner.set_message("QR code refreshed, scan the new one");
                println!("\n{}", whatsapp::generate_qr_terminal(&code)?);
            }
            _ = &mut deadline => break false,
        }
    };

    if paired {
        spinner.stop("WhatsApp linked successfully");
        cliclack::outro("Run `warden start` to begin moderating.")?;
        Ok(())
    } else {
        spinner.error("Pairing did not complete");
        anyhow::bail!("pairing timed out, run `warden pair` again")
    }
}
