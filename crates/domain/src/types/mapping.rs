//! Durable appointment/external-event mapping and imported-event rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sync health of one mapping row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Synced,
    Pending,
    Conflict,
    Error,
}

impl SyncState {
    /// Stable storage form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Pending => "pending",
            Self::Conflict => "conflict",
            Self::Error => "error",
        }
    }

    /// Parse the storage form.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "synced" => Some(Self::Synced),
            "pending" => Some(Self::Pending),
            "conflict" => Some(Self::Conflict),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Link between one internal appointment and at most one external event.
///
/// An appointment with no mapping row has never been pushed. The external
/// event id is never nulled on failure so retries can target the same
/// remote object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMapping {
    pub account_id: String,
    pub appointment_id: String,
    pub external_event_id: String,
    pub external_calendar_id: String,
    pub sync_state: SyncState,
    pub last_error: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub local_modified_at: DateTime<Utc>,
    pub external_modified_at: DateTime<Utc>,
}

impl EventMapping {
    /// Fresh mapping written after the first successful push.
    #[must_use]
    pub fn synced(
        account_id: impl Into<String>,
        appointment_id: impl Into<String>,
        external_event_id: impl Into<String>,
        external_calendar_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            account_id: account_id.into(),
            appointment_id: appointment_id.into(),
            external_event_id: external_event_id.into(),
            external_calendar_id: external_calendar_id.into(),
            sync_state: SyncState::Synced,
            last_error: None,
            last_synced_at: Some(now),
            local_modified_at: now,
            external_modified_at: now,
        }
    }
}

/// Read-only projection of an externally-owned event, surfaced as blocked
/// time. Keyed by (account, external calendar, external event); never
/// coincides with a mapped (self-authored) event id by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedEvent {
    pub account_id: String,
    pub external_calendar_id: String,
    pub external_event_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub location: Option<String>,
    pub external_modified_at: Option<DateTime<Utc>>,
    pub last_synced_at: DateTime<Utc>,
}
