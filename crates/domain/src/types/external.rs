//! Provider-facing value types: outbound drafts, normalized inbound events,
//! pull windows, and watch channels.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A fixed reminder override attached to a pushed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: i64,
}

/// Outbound event payload, produced by the translator. Provider-agnostic;
/// the infra client renders it onto the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEventDraft {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA timezone the event is rendered in on the provider side.
    pub timezone: String,
    pub color_id: String,
    pub location: Option<String>,
    pub reminders: Vec<ReminderOverride>,
}

/// Status of an event as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalEventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

/// Normalized inbound event from the provider's list feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalEvent {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// True when the provider returned a date-only start (no time of day).
    pub all_day: bool,
    pub location: Option<String>,
    pub status: ExternalEventStatus,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Half-open time window for inbound pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// Window starting now and extending `days` ahead.
    #[must_use]
    pub fn next_days(days: i64) -> Self {
        let from = Utc::now();
        Self { from, to: from + Duration::days(days) }
    }

    /// Whether a range overlaps this window.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.to && end > self.from
    }
}

/// Push-notification channel registered with the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchChannel {
    pub channel_id: String,
    pub resource_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Calendar identity resolved during OAuth consent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarIdentity {
    pub calendar_id: String,
    pub timezone: String,
}

/// Result of one inbound pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullOutcome {
    pub imported: usize,
    pub skipped: usize,
    pub pruned: usize,
}

/// Per-state mapping counts for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingCounts {
    pub synced: usize,
    pub pending: usize,
    pub conflict: usize,
    pub error: usize,
}

/// Connection health summary read by the dashboard surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub calendar_id: Option<String>,
    pub calendar_timezone: Option<String>,
    pub sync_enabled: bool,
    pub last_full_sync_at: Option<DateTime<Utc>>,
    pub mappings: MappingCounts,
    pub imported_events: usize,
}

impl ConnectionStatus {
    /// Status for an account with no stored credential.
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            calendar_id: None,
            calendar_timezone: None,
            sync_enabled: false,
            last_full_sync_at: None,
            mappings: MappingCounts::default(),
            imported_events: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_overlap_is_half_open() {
        let window = TimeWindow::next_days(7);
        assert!(window.overlaps(window.from, window.from + Duration::hours(1)));
        assert!(!window.overlaps(window.to, window.to + Duration::hours(1)));
        assert!(!window.overlaps(window.from - Duration::hours(2), window.from));
    }
}
