//! Wire types for the Google Calendar v3 API.

use serde::{Deserialize, Serialize};

/// Response from the OAuth token endpoint (refresh or code exchange).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    /// Present on the initial code exchange, absent on refreshes.
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Start or end of an event. Timed events carry `dateTime`; all-day events
/// carry a date-only `date`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// One event from the list feed. Cancelled events may carry only their id
/// and status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub id: String,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// RFC 3339 modification stamp.
    pub updated: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
}

/// Events list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventsResponse {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
    pub next_page_token: Option<String>,
}

/// Outbound event body for insert and update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub color_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub reminders: RemindersPayload,
}

/// Reminder block attached to pushed events.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindersPayload {
    pub use_default: bool,
    pub overrides: Vec<ReminderPayload>,
}

#[derive(Debug, Serialize)]
pub struct ReminderPayload {
    pub method: String,
    pub minutes: i64,
}

/// Minimal view of a created or updated event.
#[derive(Debug, Deserialize)]
pub struct EventResource {
    pub id: String,
}

/// Calendar metadata.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResource {
    pub id: String,
    pub time_zone: String,
}

/// Watch registration request body.
#[derive(Debug, Serialize)]
pub struct WatchRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    pub address: String,
    pub params: WatchParams,
}

#[derive(Debug, Serialize)]
pub struct WatchParams {
    /// Requested channel lifetime in seconds, as a string per the API.
    pub ttl: String,
}

/// Watch registration response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchResponse {
    pub id: String,
    pub resource_id: String,
    /// Expiry as epoch milliseconds, serialized as a string.
    pub expiration: Option<String>,
}

/// Channel stop request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRequest {
    pub id: String,
    pub resource_id: String,
}
