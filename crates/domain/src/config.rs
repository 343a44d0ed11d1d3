//! Application configuration types.
//!
//! Loaded by the infra config loader from environment variables or a TOML
//! file; see `clinsync-infra::config`.

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub google: GoogleConfig,
    pub webhook: WebhookConfig,
}

/// Encrypted database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLCipher database file.
    pub path: String,
    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// SQLCipher encryption key. Optional here so a config file can omit
    /// it and supply it via environment instead.
    pub encryption_key: Option<String>,
}

/// Google OAuth application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URI registered with the OAuth application.
    pub redirect_uri: String,
}

/// Webhook receiver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Local bind address, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Public HTTPS URL the provider delivers notifications to.
    pub public_url: String,
}

fn default_pool_size() -> u32 {
    10
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}
