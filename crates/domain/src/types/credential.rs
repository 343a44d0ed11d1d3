//! OAuth credential record, one row per connected account.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Which directions sync is allowed to flow for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    ToExternal,
    FromExternal,
    Bidirectional,
}

impl SyncDirection {
    /// Outbound pushes allowed?
    #[must_use]
    pub const fn pushes(self) -> bool {
        matches!(self, Self::ToExternal | Self::Bidirectional)
    }

    /// Inbound pulls allowed?
    #[must_use]
    pub const fn pulls(self) -> bool {
        matches!(self, Self::FromExternal | Self::Bidirectional)
    }

    /// Stable storage form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToExternal => "to_external",
            Self::FromExternal => "from_external",
            Self::Bidirectional => "bidirectional",
        }
    }

    /// Parse the storage form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "to_external" => Some(Self::ToExternal),
            "from_external" => Some(Self::FromExternal),
            "bidirectional" => Some(Self::Bidirectional),
            _ => None,
        }
    }
}

/// Stored OAuth credential and sync bookkeeping for one account.
///
/// The refresh token, once obtained, is never discarded except on explicit
/// disconnect. The access token may be regenerated any number of times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub account_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    /// Space-separated granted scopes, as returned by the provider.
    pub scopes: String,
    pub calendar_id: String,
    pub calendar_timezone: String,
    pub sync_enabled: bool,
    pub direction: SyncDirection,
    pub last_full_sync_at: Option<DateTime<Utc>>,
    /// Incremental sync cursor from the provider, if one has been issued.
    pub sync_cursor: Option<String>,
    pub watch_channel_id: Option<String>,
    pub watch_resource_id: Option<String>,
    pub watch_expires_at: Option<DateTime<Utc>>,
    /// Set by the first phase of disconnect; blocks new sync work until the
    /// sweep completes.
    pub disconnect_pending: bool,
}

impl CredentialRecord {
    /// Whether the access token is expired or expires within the margin.
    #[must_use]
    pub fn expires_within(&self, margin_secs: i64) -> bool {
        Utc::now() + Duration::seconds(margin_secs) >= self.expires_at
    }

    /// Whether the watch channel is missing or expires within the margin.
    #[must_use]
    pub fn watch_needs_renewal(&self, margin_secs: i64) -> bool {
        match self.watch_expires_at {
            Some(expires_at) => Utc::now() + Duration::seconds(margin_secs) >= expires_at,
            None => true,
        }
    }
}
