//! Configuration loader.
//!
//! Loads configuration from environment variables first, falling back to a
//! TOML file probed from a few conventional locations.
//!
//! ## Environment variables
//! - `CLINSYNC_DB_PATH`: database file path
//! - `CLINSYNC_DB_POOL_SIZE`: connection pool size (default 10)
//! - `CLINSYNC_DB_ENCRYPTION_KEY`: SQLCipher key
//! - `CLINSYNC_GOOGLE_CLIENT_ID` / `CLINSYNC_GOOGLE_CLIENT_SECRET`
//! - `CLINSYNC_REDIRECT_URI`: OAuth redirect URI
//! - `CLINSYNC_WEBHOOK_BIND`: local bind address (default `0.0.0.0:8080`)
//! - `CLINSYNC_WEBHOOK_PUBLIC_URL`: public notification URL
//!
//! ## File locations
//! `./clinsync.toml`, `./config.toml`, then the same two names in the
//! parent directory.

use std::path::{Path, PathBuf};

use clinsync_domain::{
    Config, DatabaseConfig, GoogleConfig, Result, SyncError, WebhookConfig,
};
use tracing::{debug, info};

/// Load configuration, preferring environment variables over files.
///
/// A `.env` file in the working directory is honoured before the
/// environment is read.
pub fn load() -> Result<Config> {
    dotenvy::dotenv().ok();

    match load_from_env() {
        Ok(config) => {
            info!("configuration loaded from environment");
            Ok(config)
        }
        Err(e) => {
            debug!(error = %e, "environment incomplete, probing config files");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables only.
pub fn load_from_env() -> Result<Config> {
    let pool_size = match std::env::var("CLINSYNC_DB_POOL_SIZE") {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|e| SyncError::Config(format!("invalid CLINSYNC_DB_POOL_SIZE: {e}")))?,
        Err(_) => 10,
    };

    Ok(Config {
        database: DatabaseConfig {
            path: env_var("CLINSYNC_DB_PATH")?,
            pool_size,
            encryption_key: std::env::var("CLINSYNC_DB_ENCRYPTION_KEY").ok(),
        },
        google: GoogleConfig {
            client_id: env_var("CLINSYNC_GOOGLE_CLIENT_ID")?,
            client_secret: env_var("CLINSYNC_GOOGLE_CLIENT_SECRET")?,
            redirect_uri: env_var("CLINSYNC_REDIRECT_URI")?,
        },
        webhook: WebhookConfig {
            bind_addr: std::env::var("CLINSYNC_WEBHOOK_BIND")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            public_url: env_var("CLINSYNC_WEBHOOK_PUBLIC_URL")?,
        },
    })
}

/// Load configuration from a TOML file. When `path` is `None`, probes the
/// conventional locations.
pub fn load_from_file(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => probe_config_paths().ok_or_else(|| {
            SyncError::Config("no configuration found in environment or files".into())
        })?,
    };

    let raw = std::fs::read_to_string(&path).map_err(|e| {
        SyncError::Config(format!("failed to read config file {}: {e}", path.display()))
    })?;

    let config: Config = toml::from_str(&raw).map_err(|e| {
        SyncError::Config(format!("invalid config file {}: {e}", path.display()))
    })?;

    info!(path = %path.display(), "configuration loaded from file");
    Ok(config)
}

fn probe_config_paths() -> Option<PathBuf> {
    const CANDIDATES: [&str; 4] =
        ["clinsync.toml", "config.toml", "../clinsync.toml", "../config.toml"];
    CANDIDATES.iter().map(PathBuf::from).find(|p| p.is_file())
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| SyncError::Config(format!("missing environment variable {name}")))
        .and_then(|value| {
            if value.trim().is_empty() {
                Err(SyncError::Config(format!("environment variable {name} is empty")))
            } else {
                Ok(value)
            }
        })
}
