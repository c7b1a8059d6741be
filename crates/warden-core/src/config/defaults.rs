//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Warden".to_string()
}

pub fn default_data_dir() -> String {
    "~/.warden".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_command_prefixes() -> Vec<String> {
    vec!["/".to_string(), "!".to_string()]
}

pub fn default_deny_message() -> String {
    "Only group admins can use this command.".to_string()
}

pub fn default_sweep_interval() -> u64 {
    30
}

pub fn default_max_warnings() -> u32 {
    3
}
