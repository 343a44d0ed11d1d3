//! Integration tests for `GoogleCalendarClient` against a WireMock server.
//!
//! Coverage:
//! - Token refresh: happy path and the terminal `invalid_grant` rejection
//! - Status classification on real responses (429, 403 quota, 5xx)
//! - Event CRUD, including the idempotent 404/410 delete
//! - Listing with pagination, timed/all-day/tombstone normalization
//! - Watch channel registration and stop

use chrono::{Duration, TimeZone, Utc};
use clinsync_core::sync::CalendarApi;
use clinsync_domain::{
    ExternalEventDraft, ExternalEventStatus, ReminderOverride, SyncError, TimeWindow,
};
use clinsync_infra::google::GoogleCalendarClient;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GoogleCalendarClient {
    GoogleCalendarClient::with_base_urls(
        "client-id".into(),
        "client-secret".into(),
        server.uri(),
        server.uri(),
    )
    .expect("client built")
}

fn draft() -> ExternalEventDraft {
    let start = Utc.with_ymd_and_hms(2026, 3, 10, 14, 0, 0).unwrap();
    ExternalEventDraft {
        summary: "✓ Consulta".into(),
        description: "Control\n\n---\nGestionado por ClinSync".into(),
        start,
        end: start + Duration::hours(1),
        timezone: "America/Caracas".into(),
        color_id: "10".into(),
        location: Some("Consultorio 3".into()),
        reminders: vec![
            ReminderOverride { method: "email".into(), minutes: 1440 },
            ReminderOverride { method: "popup".into(), minutes: 30 },
        ],
    }
}

#[tokio::test]
async fn refresh_returns_new_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.fresh",
            "expires_in": 3599,
            "token_type": "Bearer",
        })))
        .mount(&server)
        .await;

    let refreshed =
        client_for(&server).refresh_access_token("refresh-0").await.expect("refresh ok");
    assert_eq!(refreshed.access_token, "ya29.fresh");
    assert_eq!(refreshed.expires_in, 3599);
}

#[tokio::test]
async fn rejected_grant_is_auth_expired() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).refresh_access_token("revoked").await.expect_err("must fail");
    assert!(matches!(err, SyncError::AuthExpired(_)));
}

#[tokio::test]
async fn throttled_create_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_event("access", "primary", &draft())
        .await
        .expect_err("must fail");
    assert!(matches!(err, SyncError::RateLimited(_)));
}

#[tokio::test]
async fn quota_403_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"errors": [{"domain": "usageLimits", "reason": "rateLimitExceeded"}]}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_event("access", "primary", &draft())
        .await
        .expect_err("must fail");
    assert!(matches!(err, SyncError::RateLimited(_)));
}

#[tokio::test]
async fn backend_500_is_remote_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/calendars/primary/events/evt-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .update_event("access", "primary", "evt-1", &draft())
        .await
        .expect_err("must fail");
    assert!(matches!(err, SyncError::RemoteUnavailable(_)));
}

#[tokio::test]
async fn create_sends_rendered_payload_and_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(header("authorization", "Bearer access-1"))
        .and(body_partial_json(json!({
            "summary": "✓ Consulta",
            "colorId": "10",
            "start": {"timeZone": "America/Caracas"},
            "reminders": {
                "useDefault": false,
                "overrides": [
                    {"method": "email", "minutes": 1440},
                    {"method": "popup", "minutes": 30},
                ],
            },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt-new"})))
        .mount(&server)
        .await;

    let id = client_for(&server)
        .create_event("access-1", "primary", &draft())
        .await
        .expect("create ok");
    assert_eq!(id, "evt-new");
}

#[tokio::test]
async fn deleting_a_gone_event_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/calendars/primary/events/evt-gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    client_for(&server)
        .delete_event("access", "primary", "evt-gone")
        .await
        .expect("idempotent delete");
}

#[tokio::test]
async fn list_normalizes_timed_all_day_and_tombstone_events() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("showDeleted", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "timed-1",
                    "status": "confirmed",
                    "summary": "Reunión",
                    "start": {"dateTime": "2026-03-10T14:00:00-04:00"},
                    "end": {"dateTime": "2026-03-10T15:00:00-04:00"},
                    "updated": "2026-03-01T00:00:00Z",
                },
                {
                    "id": "allday-1",
                    "status": "confirmed",
                    "start": {"date": "2026-03-12"},
                    "end": {"date": "2026-03-13"},
                },
                {
                    "id": "tomb-1",
                    "status": "cancelled",
                    "updated": "2026-03-02T08:00:00Z",
                },
            ]
        })))
        .mount(&server)
        .await;

    let page = client_for(&server)
        .list_events("access", "primary", TimeWindow::next_days(90), None)
        .await
        .expect("list ok");

    assert!(page.next_page.is_none());
    assert_eq!(page.events.len(), 3);

    let timed = &page.events[0];
    assert_eq!(timed.start, Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap());
    assert!(!timed.all_day);

    let all_day = &page.events[1];
    assert!(all_day.all_day);
    assert!(all_day.title.is_none());
    assert_eq!(all_day.start, Utc.with_ymd_and_hms(2026, 3, 12, 0, 0, 0).unwrap());

    let tombstone = &page.events[2];
    assert_eq!(tombstone.status, ExternalEventStatus::Cancelled);
    assert_eq!(tombstone.start, Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
}

#[tokio::test]
async fn list_passes_page_token_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("pageToken", "tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [],
            "nextPageToken": "tok-3",
        })))
        .mount(&server)
        .await;

    let page = client_for(&server)
        .list_events("access", "primary", TimeWindow::next_days(90), Some("tok-2"))
        .await
        .expect("list ok");
    assert_eq!(page.next_page.as_deref(), Some("tok-3"));
}

#[tokio::test]
async fn watch_registration_parses_expiration() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events/watch"))
        .and(body_partial_json(json!({
            "id": "chan-1",
            "type": "web_hook",
            "address": "https://clinic.example/webhooks/calendar",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chan-1",
            "resourceId": "res-abc",
            "expiration": "1772668800000",
        })))
        .mount(&server)
        .await;

    let channel = client_for(&server)
        .watch_calendar(
            "access",
            "primary",
            "chan-1",
            "https://clinic.example/webhooks/calendar",
            604_800,
        )
        .await
        .expect("watch ok");

    assert_eq!(channel.channel_id, "chan-1");
    assert_eq!(channel.resource_id, "res-abc");
    assert_eq!(channel.expires_at, Utc.timestamp_millis_opt(1_772_668_800_000).unwrap());
}

#[tokio::test]
async fn stopping_an_unknown_channel_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/stop"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    client_for(&server).stop_channel("access", "chan-old", "res-old").await.expect("stop ok");
}
