use serde::{Deserialize, Serialize};

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub whatsapp: Option<WhatsAppConfig>,
}

/// WhatsApp channel config.
///
/// Session data is stored at `{data_dir}/whatsapp_session/`.
/// Pairing is done by scanning a QR code (like WhatsApp Web).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Groups the bot moderates (e.g. `["120363001234567890@g.us"]`). Empty = all groups.
    #[serde(default)]
    pub allowed_groups: Vec<String>,
    /// Device name shown in "Linked devices" on the phone.
    #[serde(default)]
    pub device_name: Option<String>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_groups: Vec::new(),
            device_name: None,
        }
    }
}
