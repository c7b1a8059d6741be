mod commands;
mod gateway;
mod pair;

#[cfg(test)]
mod testing;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use warden_channels::whatsapp::{self, WhatsAppChannel};
use warden_core::config::{self, shellexpand};

#[derive(Parser)]
#[command(
    name = "warden",
    version,
    about = "Warden: WhatsApp group moderation bot"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to WhatsApp and start moderating.
    Start,
    /// Show configuration and pairing state.
    Status,
    /// Link Warden as a WhatsApp device by scanning a QR code.
    Pair,
}

/// Stdout plus a daily rolling file under `{data_dir}/logs`.
///
/// `RUST_LOG` overrides `warden.log_level`. The returned guard flushes the
/// file writer on drop and must live until exit.
fn init_logging(cfg: &config::Config) -> anyhow::Result<WorkerGuard> {
    let log_dir = format!("{}/logs", shellexpand(&cfg.warden.data_dir));
    std::fs::create_dir_all(&log_dir)?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "warden.log"));
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.warden.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_logging(&cfg)?;

    match cli.command {
        Commands::Start => {
            let wa = match cfg.channel.whatsapp {
                Some(ref wa) if wa.enabled => wa.clone(),
                _ => anyhow::bail!(
                    "WhatsApp is disabled. Enable [channel.whatsapp] in {}.",
                    cli.config
                ),
            };
            if !whatsapp::session_exists(&cfg.warden.data_dir) {
                anyhow::bail!("No WhatsApp session found. Run `warden pair` first.");
            }

            let channel = Arc::new(WhatsAppChannel::new(wa, &cfg.warden.data_dir));

            println!("{}: starting moderation...", cfg.warden.name);
            let gw = Arc::new(gateway::Gateway::new(
                channel,
                cfg.auth.clone(),
                cfg.moderation.clone(),
            ));
            gw.run().await?;
        }
        Commands::Status => {
            println!("{}: status check\n", cfg.warden.name);
            println!("Config:   {}", cli.config);
            println!("Data dir: {}", shellexpand(&cfg.warden.data_dir));
            println!();

            match cfg.channel.whatsapp {
                Some(ref wa) if wa.enabled => {
                    let paired = whatsapp::session_exists(&cfg.warden.data_dir);
                    println!(
                        "  whatsapp: {}",
                        if paired { "paired" } else { "not paired (run `warden pair`)" }
                    );
                    if wa.allowed_groups.is_empty() {
                        println!("  groups:   all");
                    } else {
                        println!("  groups:   {}", wa.allowed_groups.join(", "));
                    }
                }
                Some(_) => println!("  whatsapp: disabled"),
                None => println!("  whatsapp: not configured"),
            }
            println!();

            let m = &cfg.moderation;
            println!("  sweep interval:  {}s", m.sweep_interval_secs);
            println!(
                "  warning limit:   {}",
                if m.max_warnings == 0 {
                    "off".to_string()
                } else if m.kick_on_max_warnings {
                    format!("{} (kick)", m.max_warnings)
                } else {
                    m.max_warnings.to_string()
                }
            );
            println!(
                "  admin-only:      {}",
                if cfg.auth.admin_only { "yes" } else { "no" }
            );
            println!("  owners:          {}", cfg.auth.owners.len());
        }
        Commands::Pair => {
            let device_name = cfg
                .channel
                .whatsapp
                .as_ref()
                .and_then(|wa| wa.device_name.clone());
            pair::run(&cfg.warden.data_dir, device_name).await?;
        }
    }

    Ok(())
}
