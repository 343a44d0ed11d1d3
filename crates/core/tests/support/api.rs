//! Scripted fake for the `CalendarApi` port.
//!
//! Each method can be given a fixed error; otherwise it succeeds with
//! deterministic data. Call counters let tests assert exactly how often
//! the provider was hit.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use clinsync_core::sync::{CalendarApi, EventPage, RefreshedToken};
use clinsync_domain::{
    CalendarIdentity, ExternalEvent, ExternalEventDraft, Result as SyncResult, SyncError,
    TimeWindow, WatchChannel,
};

/// Programmable provider double with per-method call counters.
#[derive(Default)]
pub struct FakeCalendarApi {
    pub refresh_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub watch_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,

    refresh_error: Mutex<Option<SyncError>>,
    create_error: Mutex<Option<SyncError>>,
    update_error: Mutex<Option<SyncError>>,
    delete_error: Mutex<Option<SyncError>>,
    list_error: Mutex<Option<SyncError>>,

    /// Pages served by `list_events`, consumed front to back. When empty,
    /// an empty final page is returned.
    pages: Mutex<VecDeque<Vec<ExternalEvent>>>,
    /// Event ids handed out by `create_event`, in order.
    created: Mutex<Vec<String>>,
    /// Event ids passed to `delete_event`, in order.
    deleted: Mutex<Vec<String>>,
}

impl FakeCalendarApi {
    /// Fail every `refresh_access_token` call with this error.
    pub fn fail_refresh(&self, error: SyncError) {
        *self.refresh_error.lock().unwrap() = Some(error);
    }

    /// Fail every `create_event` call with this error.
    pub fn fail_create(&self, error: SyncError) {
        *self.create_error.lock().unwrap() = Some(error);
    }

    /// Fail every `update_event` call with this error.
    pub fn fail_update(&self, error: SyncError) {
        *self.update_error.lock().unwrap() = Some(error);
    }

    /// Fail every `delete_event` call with this error.
    pub fn fail_delete(&self, error: SyncError) {
        *self.delete_error.lock().unwrap() = Some(error);
    }

    /// Queue one page for `list_events`.
    pub fn push_page(&self, events: Vec<ExternalEvent>) {
        self.pages.lock().unwrap().push_back(events);
    }

    /// Event ids created so far.
    pub fn created_ids(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    /// Event ids deleted so far.
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    fn scripted(slot: &Mutex<Option<SyncError>>) -> SyncResult<()> {
        match slot.lock().unwrap().as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CalendarApi for FakeCalendarApi {
    async fn refresh_access_token(&self, _refresh_token: &str) -> SyncResult<RefreshedToken> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Self::scripted(&self.refresh_error)?;
        Ok(RefreshedToken { access_token: format!("access-{n}"), expires_in: 3600 })
    }

    async fn get_calendar(
        &self,
        _access_token: &str,
        calendar_id: &str,
    ) -> SyncResult<CalendarIdentity> {
        Ok(CalendarIdentity {
            calendar_id: calendar_id.to_string(),
            timezone: "America/Caracas".into(),
        })
    }

    async fn create_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        _draft: &ExternalEventDraft,
    ) -> SyncResult<String> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Self::scripted(&self.create_error)?;
        let event_id = format!("evt-{n}");
        self.created.lock().unwrap().push(event_id.clone());
        Ok(event_id)
    }

    async fn update_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        _event_id: &str,
        _draft: &ExternalEventDraft,
    ) -> SyncResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Self::scripted(&self.update_error)
    }

    async fn delete_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        event_id: &str,
    ) -> SyncResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Self::scripted(&self.delete_error)?;
        self.deleted.lock().unwrap().push(event_id.to_string());
        Ok(())
    }

    async fn list_events(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        _window: TimeWindow,
        _page_token: Option<&str>,
    ) -> SyncResult<EventPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Self::scripted(&self.list_error)?;
        let mut pages = self.pages.lock().unwrap();
        let events = pages.pop_front().unwrap_or_default();
        let next_page =
            if pages.is_empty() { None } else { Some(format!("page-{}", pages.len())) };
        Ok(EventPage { events, next_page })
    }

    async fn watch_calendar(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        channel_id: &str,
        _callback_url: &str,
        ttl_secs: i64,
    ) -> SyncResult<WatchChannel> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(WatchChannel {
            channel_id: channel_id.to_string(),
            resource_id: format!("res-{channel_id}"),
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
        })
    }

    async fn stop_channel(
        &self,
        _access_token: &str,
        _channel_id: &str,
        _resource_id: &str,
    ) -> SyncResult<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
