//! Error types used throughout the sync engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for clinsync
///
/// Remote-call failures are classified by kind so callers can make retry
/// decisions from the variant, never from message contents.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SyncError {
    /// No credential stored for the account (calendar never connected, or
    /// disconnected).
    #[error("Calendar not connected: {0}")]
    NotConnected(String),

    /// The refresh token was revoked by the provider. Terminal: requires the
    /// clinician to re-authorize, must never be retried by background jobs.
    #[error("Authorization expired, reconnect required: {0}")]
    AuthExpired(String),

    /// Provider rate limit hit (429 or quota 403). Retryable with backoff.
    #[error("Rate limited by provider: {0}")]
    RateLimited(String),

    /// Definitive provider-side rejection (other 4xx). Not retryable.
    #[error("Rejected by provider: {0}")]
    RemoteRejected(String),

    /// Provider 5xx, timeout, or transport failure. Retryable.
    #[error("Provider unavailable: {0}")]
    RemoteUnavailable(String),

    /// Local and remote copies both changed since the last sync. Surfaced to
    /// the operator, never auto-merged.
    #[error("Sync conflict: {0}")]
    MappingConflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Whether a retry (with backoff) is a sensible response to this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::RemoteUnavailable(_))
    }

    /// Terminal errors require operator action (re-consent); background jobs
    /// must stop retrying when they see one.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::AuthExpired(_) | Self::NotConnected(_))
    }
}

/// Result type alias for clinsync operations
pub type Result<T> = std::result::Result<T, SyncError>;
