//! Inbound import of externally-owned events as read-only blocked time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};

use clinsync_domain::constants::UNTITLED_EVENT;
use clinsync_domain::{
    EventMapping, ExternalEvent, ExternalEventStatus, ImportedEvent, PullOutcome, Result,
    TimeWindow,
};

use super::locks::AccountLockRegistry;
use super::ports::{CalendarApi, CredentialStore, EventMappingStore, ImportedEventStore};
use super::token::TokenManager;

/// Slack when comparing provider update stamps against our last sync, so
/// the provider bumping `updated` on our own writes does not self-flag.
const CONFLICT_SLACK_SECS: i64 = 5;

/// Pulls provider events for a window, skipping self-authored and
/// cancelled ones, and maintains the imported-event projection.
pub struct InboundImporter {
    credentials: Arc<dyn CredentialStore>,
    mappings: Arc<dyn EventMappingStore>,
    imported: Arc<dyn ImportedEventStore>,
    tokens: Arc<TokenManager>,
    api: Arc<dyn CalendarApi>,
    locks: Arc<AccountLockRegistry>,
}

impl InboundImporter {
    /// Wire up an importer over the shared stores and lock registry.
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        mappings: Arc<dyn EventMappingStore>,
        imported: Arc<dyn ImportedEventStore>,
        tokens: Arc<TokenManager>,
        api: Arc<dyn CalendarApi>,
        locks: Arc<AccountLockRegistry>,
    ) -> Self {
        Self { credentials, mappings, imported, tokens, api, locks }
    }

    /// Pull the provider feed for a window and refresh the projection.
    ///
    /// Idempotent: duplicate webhook deliveries or overlapping scheduled
    /// pulls converge on the same rows.
    #[instrument(skip(self))]
    pub async fn pull(&self, account_id: &str, window: TimeWindow) -> Result<PullOutcome> {
        let _guard = self.locks.lock(account_id).await;
        let auth = self.tokens.authorized(account_id).await?;

        let own: HashMap<String, EventMapping> = self
            .mappings
            .list_for_account(account_id)
            .await?
            .into_iter()
            .map(|m| (m.external_event_id.clone(), m))
            .collect();

        let mut outcome = PullOutcome::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .api
                .list_events(&auth.access_token, &auth.calendar_id, window, page_token.as_deref())
                .await?;

            for event in page.events {
                if let Some(mapping) = own.get(&event.id) {
                    // Self-authored: excluded by construction, but a remote
                    // edit newer than our last push is flagged for the
                    // operator.
                    outcome.skipped += 1;
                    self.flag_remote_edit(mapping, &event).await?;
                    continue;
                }

                if event.status == ExternalEventStatus::Cancelled {
                    outcome.skipped += 1;
                    continue;
                }

                let row = Self::to_imported(account_id, &auth.calendar_id, &event);
                self.imported.upsert(&row).await?;
                seen.insert(event.id);
                outcome.imported += 1;
            }

            page_token = page.next_page;
            if page_token.is_none() {
                break;
            }
            debug!(account_id, "following events page cursor");
        }

        outcome.pruned =
            self.imported.prune_absent(account_id, &auth.calendar_id, window, &seen).await?;

        self.credentials.mark_full_sync(account_id, Utc::now(), None).await?;

        info!(
            account_id,
            imported = outcome.imported,
            skipped = outcome.skipped,
            pruned = outcome.pruned,
            "inbound pull completed"
        );
        Ok(outcome)
    }

    async fn flag_remote_edit(&self, mapping: &EventMapping, event: &ExternalEvent) -> Result<()> {
        let (Some(updated_at), Some(last_synced_at)) = (event.updated_at, mapping.last_synced_at)
        else {
            return Ok(());
        };

        if updated_at > last_synced_at + Duration::seconds(CONFLICT_SLACK_SECS) {
            warn!(
                appointment_id = %mapping.appointment_id,
                external_event_id = %event.id,
                "remote copy edited since last sync, flagging conflict"
            );
            self.mappings
                .mark_conflict(
                    &mapping.appointment_id,
                    "external event modified since last sync",
                )
                .await?;
        }
        Ok(())
    }

    fn to_imported(account_id: &str, calendar_id: &str, event: &ExternalEvent) -> ImportedEvent {
        ImportedEvent {
            account_id: account_id.to_string(),
            external_calendar_id: calendar_id.to_string(),
            external_event_id: event.id.clone(),
            title: event
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(UNTITLED_EVENT)
                .to_string(),
            description: event.description.clone(),
            start: event.start,
            end: event.end,
            all_day: event.all_day,
            location: event.location.clone(),
            external_modified_at: event.updated_at,
            last_synced_at: Utc::now(),
        }
    }
}
