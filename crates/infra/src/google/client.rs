//! Google Calendar v3 HTTP client implementing the `CalendarApi` port.
//!
//! Every call carries a bounded timeout and maps provider responses onto
//! the error taxonomy so the core never inspects HTTP statuses.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clinsync_core::sync::{CalendarApi, EventPage, RefreshedToken};
use clinsync_domain::constants::REMOTE_CALL_TIMEOUT_SECS;
use clinsync_domain::{
    CalendarIdentity, ExternalEvent, ExternalEventDraft, ExternalEventStatus, Result, SyncError,
    TimeWindow, WatchChannel,
};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument, warn};

use super::types::{
    CalendarResource, EventDateTime, EventPayload, EventResource, GoogleEvent,
    GoogleEventsResponse, ReminderPayload, RemindersPayload, StopRequest, TokenResponse,
    WatchParams, WatchRequest, WatchResponse,
};
use crate::errors::InfraError;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_TOKEN_BASE: &str = "https://oauth2.googleapis.com";
const PAGE_SIZE: u32 = 250;

/// HTTP client for the Google Calendar API.
pub struct GoogleCalendarClient {
    http: Client,
    api_base: String,
    token_base: String,
    client_id: String,
    client_secret: String,
}

impl GoogleCalendarClient {
    /// Create a client against the production Google endpoints.
    pub fn new(client_id: String, client_secret: String) -> Result<Self> {
        Self::with_base_urls(
            client_id,
            client_secret,
            DEFAULT_API_BASE.to_string(),
            DEFAULT_TOKEN_BASE.to_string(),
        )
    }

    /// Create a client against explicit base URLs. Tests point this at a
    /// local mock server.
    pub fn with_base_urls(
        client_id: String,
        client_secret: String,
        api_base: String,
        token_base: String,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REMOTE_CALL_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::Internal(format!("failed to build http client: {e}")))?;

        Ok(Self { http, api_base, token_base, client_id, client_secret })
    }

    /// Exchange an authorization code for tokens. Used by the OAuth consent
    /// flow, not by the port.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse> {
        let response = self
            .http
            .post(format!("{}/token", self.token_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(InfraError::from)?;

        let response = check_token_response(response).await?;
        Ok(response.json::<TokenResponse>().await.map_err(InfraError::from)?)
    }

    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

/// Map an HTTP failure status onto the error taxonomy.
fn classify_status(status: StatusCode, body: &str) -> SyncError {
    match status {
        StatusCode::UNAUTHORIZED => {
            SyncError::AuthExpired(format!("provider rejected credentials: {body}"))
        }
        StatusCode::TOO_MANY_REQUESTS => SyncError::RateLimited(format!("429: {body}")),
        StatusCode::FORBIDDEN
            if body.contains("rateLimitExceeded")
                || body.contains("quotaExceeded")
                || body.contains("usageLimits") =>
        {
            SyncError::RateLimited(format!("quota exhausted: {body}"))
        }
        s if s.is_client_error() => SyncError::RemoteRejected(format!("{s}: {body}")),
        s => SyncError::RemoteUnavailable(format!("{s}: {body}")),
    }
}

/// Token endpoint failures are classified separately: a rejected grant is
/// terminal, everything else keeps its transport kind.
async fn check_token_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if body.contains("invalid_grant") {
        return Err(SyncError::AuthExpired(format!("refresh grant rejected: {body}")));
    }
    Err(classify_status(status, &body))
}

fn event_payload(draft: &ExternalEventDraft) -> EventPayload {
    EventPayload {
        summary: draft.summary.clone(),
        description: draft.description.clone(),
        start: EventDateTime {
            date_time: Some(draft.start.to_rfc3339()),
            date: None,
            time_zone: Some(draft.timezone.clone()),
        },
        end: EventDateTime {
            date_time: Some(draft.end.to_rfc3339()),
            date: None,
            time_zone: Some(draft.timezone.clone()),
        },
        color_id: draft.color_id.clone(),
        location: draft.location.clone(),
        reminders: RemindersPayload {
            use_default: false,
            overrides: draft
                .reminders
                .iter()
                .map(|r| ReminderPayload { method: r.method.clone(), minutes: r.minutes })
                .collect(),
        },
    }
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc))
}

fn parse_event_time(value: &EventDateTime) -> Option<DateTime<Utc>> {
    if let Some(date_time) = &value.date_time {
        return parse_rfc3339(date_time);
    }
    let date = value.date.as_deref()?;
    let naive = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&naive.and_hms_opt(0, 0, 0)?))
}

/// Normalize a wire event. Events with unparseable times are dropped with
/// a warning rather than failing the whole page; cancelled tombstones
/// often ship without times at all and get placeholder bounds.
fn normalize_event(raw: GoogleEvent) -> Option<ExternalEvent> {
    let status = match raw.status.as_deref() {
        Some("cancelled") => ExternalEventStatus::Cancelled,
        Some("tentative") => ExternalEventStatus::Tentative,
        _ => ExternalEventStatus::Confirmed,
    };

    let all_day = raw.start.as_ref().is_some_and(|s| s.date.is_some());
    let start = raw.start.as_ref().and_then(parse_event_time);
    let end = raw.end.as_ref().and_then(parse_event_time);
    let updated_at = raw.updated.as_deref().and_then(parse_rfc3339);

    let (start, end) = match (start, end) {
        (Some(s), Some(e)) => (s, e),
        _ if status == ExternalEventStatus::Cancelled => {
            let stamp = updated_at.unwrap_or_else(Utc::now);
            (stamp, stamp)
        }
        _ => {
            warn!(event_id = %raw.id, "dropping event with unparseable times");
            return None;
        }
    };

    Some(ExternalEvent {
        id: raw.id,
        title: raw.summary,
        description: raw.description,
        start,
        end,
        all_day,
        location: raw.location,
        status,
        updated_at,
    })
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    #[instrument(skip(self, refresh_token))]
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<RefreshedToken> {
        let response = self
            .http
            .post(format!("{}/token", self.token_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(InfraError::from)?;

        let response = check_token_response(response).await?;
        let token: TokenResponse = response.json().await.map_err(InfraError::from)?;
        debug!(expires_in = token.expires_in, "access token refreshed");
        Ok(RefreshedToken { access_token: token.access_token, expires_in: token.expires_in })
    }

    #[instrument(skip(self, access_token))]
    async fn get_calendar(&self, access_token: &str, calendar_id: &str) -> Result<CalendarIdentity> {
        let response = self
            .http
            .get(format!("{}/calendars/{calendar_id}", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(InfraError::from)?;

        let response = self.check(response).await?;
        let calendar: CalendarResource = response.json().await.map_err(InfraError::from)?;
        Ok(CalendarIdentity { calendar_id: calendar.id, timezone: calendar.time_zone })
    }

    #[instrument(skip(self, access_token, draft), fields(summary = %draft.summary))]
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        draft: &ExternalEventDraft,
    ) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/calendars/{calendar_id}/events", self.api_base))
            .bearer_auth(access_token)
            .json(&event_payload(draft))
            .send()
            .await
            .map_err(InfraError::from)?;

        let response = self.check(response).await?;
        let created: EventResource = response.json().await.map_err(InfraError::from)?;
        Ok(created.id)
    }

    #[instrument(skip(self, access_token, draft))]
    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        draft: &ExternalEventDraft,
    ) -> Result<()> {
        let response = self
            .http
            .put(format!("{}/calendars/{calendar_id}/events/{event_id}", self.api_base))
            .bearer_auth(access_token)
            .json(&event_payload(draft))
            .send()
            .await
            .map_err(InfraError::from)?;

        self.check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, access_token))]
    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/calendars/{calendar_id}/events/{event_id}", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(InfraError::from)?;

        // An already-deleted remote event is success for our purposes.
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            debug!(event_id, "remote event already gone");
            return Ok(());
        }
        self.check(response).await?;
        Ok(())
    }

    #[instrument(skip(self, access_token))]
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        window: TimeWindow,
        page_token: Option<&str>,
    ) -> Result<EventPage> {
        let mut query: Vec<(&str, String)> = vec![
            ("timeMin", window.from.to_rfc3339()),
            ("timeMax", window.to.to_rfc3339()),
            ("singleEvents", "true".into()),
            ("showDeleted", "true".into()),
            ("maxResults", PAGE_SIZE.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .http
            .get(format!("{}/calendars/{calendar_id}/events", self.api_base))
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(InfraError::from)?;

        let response = self.check(response).await?;
        let listing: GoogleEventsResponse = response.json().await.map_err(InfraError::from)?;

        Ok(EventPage {
            events: listing.items.into_iter().filter_map(normalize_event).collect(),
            next_page: listing.next_page_token,
        })
    }

    #[instrument(skip(self, access_token, callback_url))]
    async fn watch_calendar(
        &self,
        access_token: &str,
        calendar_id: &str,
        channel_id: &str,
        callback_url: &str,
        ttl_secs: i64,
    ) -> Result<WatchChannel> {
        let request = WatchRequest {
            id: channel_id.to_string(),
            channel_type: "web_hook".into(),
            address: callback_url.to_string(),
            params: WatchParams { ttl: ttl_secs.to_string() },
        };

        let response = self
            .http
            .post(format!("{}/calendars/{calendar_id}/events/watch", self.api_base))
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
            .map_err(InfraError::from)?;

        let response = self.check(response).await?;
        let watch: WatchResponse = response.json().await.map_err(InfraError::from)?;

        let expires_at = watch
            .expiration
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(ttl_secs));

        Ok(WatchChannel { channel_id: watch.id, resource_id: watch.resource_id, expires_at })
    }

    #[instrument(skip(self, access_token))]
    async fn stop_channel(
        &self,
        access_token: &str,
        channel_id: &str,
        resource_id: &str,
    ) -> Result<()> {
        let request =
            StopRequest { id: channel_id.to_string(), resource_id: resource_id.to_string() };

        let response = self
            .http
            .post(format!("{}/channels/stop", self.api_base))
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
            .map_err(InfraError::from)?;

        // Unknown channels are already stopped.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.check(response).await?;
        Ok(())
    }
}
