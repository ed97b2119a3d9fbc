use serde::{Deserialize, Serialize};

/// Global Bookline configuration, loaded from `config.toml` in the data
/// directory. Every field has a default so a missing file is not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BooklineConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub collaborators: CollaboratorConfig,
}

impl Default for BooklineConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            booking: BookingConfig::default(),
            collaborators: CollaboratorConfig::default(),
        }
    }
}

/// HTTP server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Slot computation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// System-wide slot granularity in minutes.
    #[serde(default = "default_granularity")]
    pub slot_granularity_minutes: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            slot_granularity_minutes: default_granularity(),
        }
    }
}

/// External collaborator endpoints. Unset endpoints disable the
/// corresponding dispatch (logged, never an error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// Base URL of the REST meeting service.
    pub calendar_base_url: Option<String>,
    /// Bearer token for the meeting service.
    pub calendar_token: Option<String>,
    /// Webhook base URL of the CRM (events are created under it).
    pub crm_webhook_url: Option<String>,
    /// Upper bound on any single collaborator call, in seconds.
    #[serde(default = "default_effects_timeout")]
    pub timeout_secs: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            calendar_base_url: None,
            calendar_token: None,
            crm_webhook_url: None,
            timeout_secs: default_effects_timeout(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_granularity() -> u32 {
    30
}

fn default_effects_timeout() -> u64 {
    10
}
