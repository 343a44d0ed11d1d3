//! Port interfaces for the sync engine
//!
//! These traits define the boundaries between core business logic and
//! infrastructure implementations: the three persisted tables, the
//! appointment store owned by the scheduling subsystem, and the external
//! calendar provider API.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinsync_domain::{
    Appointment, CalendarIdentity, CredentialRecord, EventMapping, ExternalEvent,
    ExternalEventDraft, ImportedEvent, MappingCounts, Result, TimeWindow, WatchChannel,
};

/// Trait for persisting OAuth credentials, one row per account.
///
/// All mutations are single-row atomic upserts keyed by account id; no
/// read-modify-write sequences span separate calls.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the credential for an account, if connected.
    async fn get(&self, account_id: &str) -> Result<Option<CredentialRecord>>;

    /// Insert or replace the credential (initial consent or reconnect).
    async fn upsert(&self, record: &CredentialRecord) -> Result<()>;

    /// Atomically replace the access token and expiry after a refresh.
    /// Must never touch the refresh token.
    async fn update_access_token(
        &self,
        account_id: &str,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Store or clear the active watch channel.
    async fn update_watch_channel(
        &self,
        account_id: &str,
        channel: Option<&WatchChannel>,
    ) -> Result<()>;

    /// Record a completed full sync and optional incremental cursor.
    async fn mark_full_sync(
        &self,
        account_id: &str,
        at: DateTime<Utc>,
        cursor: Option<&str>,
    ) -> Result<()>;

    /// First phase of disconnect: block new sync work for the account.
    async fn set_disconnect_pending(&self, account_id: &str, pending: bool) -> Result<()>;

    /// Resolve the account owning a watch channel (webhook dispatch).
    async fn find_by_watch_channel(&self, channel_id: &str) -> Result<Option<CredentialRecord>>;

    /// Delete the credential row. Irreversible.
    async fn delete(&self, account_id: &str) -> Result<()>;
}

/// Trait for the durable appointment/external-event mapping table.
///
/// At most one mapping per appointment; the uniqueness constraint is
/// enforced at the storage layer.
#[async_trait]
pub trait EventMappingStore: Send + Sync {
    /// Fetch the mapping for an appointment, if it was ever pushed.
    async fn find_by_appointment(&self, appointment_id: &str) -> Result<Option<EventMapping>>;

    /// Insert a new mapping. Fails on a duplicate appointment id; the
    /// caller handles the lost race.
    async fn insert(&self, mapping: &EventMapping) -> Result<()>;

    /// Record a successful push: state synced, error cleared, timestamps
    /// advanced. The external event id is left untouched.
    async fn mark_synced(
        &self,
        appointment_id: &str,
        external_modified_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Record a failed push: state error plus message. The previous
    /// external event id is preserved so retries target the same remote
    /// object.
    async fn mark_error(&self, appointment_id: &str, message: &str) -> Result<()>;

    /// Flag a mapping whose remote copy changed since the last sync.
    async fn mark_conflict(&self, appointment_id: &str, message: &str) -> Result<()>;

    /// Delete the mapping row (after the remote event was deleted).
    async fn delete(&self, appointment_id: &str) -> Result<()>;

    /// All mappings for an account (inbound self-authored filtering).
    async fn list_for_account(&self, account_id: &str) -> Result<Vec<EventMapping>>;

    /// External event ids already owned by this system for an account.
    async fn external_event_ids(&self, account_id: &str) -> Result<HashSet<String>>;

    /// Per-state counts for the dashboard surface.
    async fn count_by_state(&self, account_id: &str) -> Result<MappingCounts>;

    /// Disconnect sweep. Returns the number of rows removed.
    async fn delete_all_for_account(&self, account_id: &str) -> Result<usize>;
}

/// Trait for the read-only imported-event projection.
#[async_trait]
pub trait ImportedEventStore: Send + Sync {
    /// Insert or refresh a row keyed by (account, calendar, external id).
    async fn upsert(&self, event: &ImportedEvent) -> Result<()>;

    /// Imported events overlapping a window, ordered by start.
    async fn list_window(&self, account_id: &str, window: TimeWindow)
        -> Result<Vec<ImportedEvent>>;

    /// Remove rows inside the window whose external ids are absent from the
    /// latest provider feed. Returns the number pruned.
    async fn prune_absent(
        &self,
        account_id: &str,
        calendar_id: &str,
        window: TimeWindow,
        seen: &HashSet<String>,
    ) -> Result<usize>;

    /// Count of imported rows for an account.
    async fn count_for_account(&self, account_id: &str) -> Result<usize>;

    /// Disconnect sweep. Returns the number of rows removed.
    async fn delete_all_for_account(&self, account_id: &str) -> Result<usize>;
}

/// Trait over the scheduling subsystem's appointment records.
///
/// The sync engine reads appointments and writes back only the last-pushed
/// marker; it never owns appointment business state.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Fetch an appointment by id.
    async fn get(&self, appointment_id: &str) -> Result<Option<Appointment>>;

    /// Appointments for an account that belong on the external calendar.
    async fn list_pushable(&self, account_id: &str) -> Result<Vec<Appointment>>;

    /// Record when the appointment was last pushed (epoch seconds).
    async fn set_last_pushed(&self, appointment_id: &str, at: i64) -> Result<()>;
}

/// One page of a provider events listing.
#[derive(Debug, Clone)]
pub struct EventPage {
    pub events: Vec<ExternalEvent>,
    pub next_page: Option<String>,
}

/// Access token minted by a refresh-token exchange.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Lifetime in seconds, relative to now.
    pub expires_in: i64,
}

/// Trait for the external calendar provider API.
///
/// Every method is a bounded-timeout network call. Implementations map
/// provider responses onto the error taxonomy: 429/quota to `RateLimited`,
/// other 4xx to `RemoteRejected`, 5xx and transport failures to
/// `RemoteUnavailable`, and a rejected refresh grant to `AuthExpired`.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Exchange a refresh token for a new access token.
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<RefreshedToken>;

    /// Resolve a calendar's id and timezone.
    async fn get_calendar(&self, access_token: &str, calendar_id: &str)
        -> Result<CalendarIdentity>;

    /// Create an event; returns the provider-assigned event id.
    ///
    /// Not guaranteed idempotent by the provider: a retry after a timeout
    /// can duplicate the remote event.
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        draft: &ExternalEventDraft,
    ) -> Result<String>;

    /// Update an existing event in place.
    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        draft: &ExternalEventDraft,
    ) -> Result<()>;

    /// Delete an event. Deleting an already-gone event (404/410) succeeds.
    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<()>;

    /// List events in a window, one page at a time.
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        window: TimeWindow,
        page_token: Option<&str>,
    ) -> Result<EventPage>;

    /// Register a push-notification channel for a calendar.
    async fn watch_calendar(
        &self,
        access_token: &str,
        calendar_id: &str,
        channel_id: &str,
        callback_url: &str,
        ttl_secs: i64,
    ) -> Result<WatchChannel>;

    /// Stop a previously registered channel. Unknown channels succeed.
    async fn stop_channel(
        &self,
        access_token: &str,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<()>;
}
