mod channels;
mod defaults;


pub use channels::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::WardenError;
use defaults::*;

/// Top-level Warden configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub warden: WardenConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Who may run moderation commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Whether moderation commands are restricted to group admins (default: true).
    #[serde(default = "default_true")]
    pub admin_only: bool,
    /// Phone numbers that may moderate every group regardless of admin status.
    #[serde(default)]
    pub owners: Vec<String>,
    /// Reply sent when a non-admin tries a moderation command.
    #[serde(default = "default_deny_message")]
    pub deny_message: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_only: true,
            owners: Vec::new(),
            deny_message: default_deny_message(),
        }
    }
}

/// Moderation engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Seconds between expiry sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Warning count at which the limit action fires. 0 = no limit.
    #[serde(default = "default_max_warnings")]
    pub max_warnings: u32,
    /// Remove a participant from the group when they reach `max_warnings`.
    #[serde(default)]
    pub kick_on_max_warnings: bool,
    /// Retry failed "restore group to open" calls on later sweeps.
    #[serde(default)]
    pub retry_failed_restores: bool,
    /// Add a warning when a non-admin posts a link in an antilink group.
    #[serde(default = "default_true")]
    pub antilink_warns: bool,
    /// Characters that introduce a command (e.g. `/mute`, `!mute`).
    #[serde(default = "default_command_prefixes")]
    pub command_prefixes: Vec<String>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            max_warnings: default_max_warnings(),
            kick_on_max_warnings: false,
            retry_failed_restores: false,
            antilink_warns: true,
            command_prefixes: default_command_prefixes(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, WardenError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config {
            channel: ChannelConfig {
                whatsapp: Some(WhatsAppConfig::default()),
            },
            ..Default::default()
        });
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| WardenError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    parse(&content)
}

/// Parse configuration from TOML text.
pub fn parse(content: &str) -> Result<Config, WardenError> {
    let config: Config = toml::from_str(content)
        .map_err(|e| WardenError::Config(format!("failed to parse config: {}", e)))?;

    if config.moderation.sweep_interval_secs == 0 {
        return Err(WardenError::Config(
            "moderation.sweep_interval_secs must be at least 1".into(),
        ));
    }

    Ok(config)
}
