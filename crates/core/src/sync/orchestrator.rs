//! Sync façade invoked by the rest of the system.
//!
//! Appointment CRUD hooks, scheduled jobs, and the webhook receiver all go
//! through this type; it sequences the components per account and applies
//! the enabled/direction gates.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use clinsync_domain::{
    Appointment, ConnectionStatus, PullOutcome, Result, SyncError, TimeWindow,
};

use super::inbound::InboundImporter;
use super::locks::AccountLockRegistry;
use super::outbound::OutboundSyncer;
use super::ports::{
    AppointmentStore, CalendarApi, CredentialStore, EventMappingStore, ImportedEventStore,
};
use super::watch::WatchChannelManager;

/// Outcome of a bulk outbound push.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BulkPushOutcome {
    pub pushed: usize,
    /// Appointment ids that failed, with their error kinds.
    pub failures: Vec<(String, SyncError)>,
}

/// Orchestrates per-account sync operations.
pub struct SyncOrchestrator {
    credentials: Arc<dyn CredentialStore>,
    mappings: Arc<dyn EventMappingStore>,
    imported: Arc<dyn ImportedEventStore>,
    appointments: Arc<dyn AppointmentStore>,
    outbound: Arc<OutboundSyncer>,
    inbound: Arc<InboundImporter>,
    watch: Arc<WatchChannelManager>,
    api: Arc<dyn CalendarApi>,
    locks: Arc<AccountLockRegistry>,
}

impl SyncOrchestrator {
    /// Wire up the façade over the shared components.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        mappings: Arc<dyn EventMappingStore>,
        imported: Arc<dyn ImportedEventStore>,
        appointments: Arc<dyn AppointmentStore>,
        outbound: Arc<OutboundSyncer>,
        inbound: Arc<InboundImporter>,
        watch: Arc<WatchChannelManager>,
        api: Arc<dyn CalendarApi>,
        locks: Arc<AccountLockRegistry>,
    ) -> Self {
        Self { credentials, mappings, imported, appointments, outbound, inbound, watch, api, locks }
    }

    /// Hook called after an appointment is created.
    ///
    /// Returns the external event id when a push happened, `None` when the
    /// account is not pushing (disconnected, disabled, wrong direction) or
    /// the appointment status stays off the calendar.
    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    pub async fn on_appointment_created(
        &self,
        appointment: &Appointment,
    ) -> Result<Option<String>> {
        if !self.pushes_enabled(&appointment.account_id).await? {
            return Ok(None);
        }
        if !appointment.status.is_pushable() {
            return Ok(None);
        }
        self.outbound.push(&appointment.id).await.map(Some)
    }

    /// Hook called after an appointment is updated. A local edit is the
    /// newest writer, so it overwrites a conflicted mapping. Transitions
    /// into a terminal status remove the remote event instead.
    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    pub async fn on_appointment_updated(
        &self,
        appointment: &Appointment,
    ) -> Result<Option<String>> {
        if !self.pushes_enabled(&appointment.account_id).await? {
            return Ok(None);
        }
        if appointment.status.is_pushable() {
            self.outbound.push_overwriting(&appointment.id).await.map(Some)
        } else {
            self.outbound.remove(&appointment.id).await?;
            Ok(None)
        }
    }

    /// Hook called after an appointment is cancelled or deleted.
    #[instrument(skip(self, appointment), fields(appointment_id = %appointment.id))]
    pub async fn on_appointment_cancelled(&self, appointment: &Appointment) -> Result<()> {
        if !self.pushes_enabled(&appointment.account_id).await? {
            return Ok(());
        }
        self.outbound.remove(&appointment.id).await
    }

    /// Push one appointment on demand (scheduled job, dashboard retry).
    pub async fn push_one(&self, appointment_id: &str) -> Result<String> {
        self.outbound.push(appointment_id).await
    }

    /// Push every calendar-worthy appointment for an account. Failures are
    /// collected per appointment; a terminal auth error aborts the batch
    /// since every remaining push would fail the same way.
    #[instrument(skip(self))]
    pub async fn push_all(&self, account_id: &str) -> Result<BulkPushOutcome> {
        if !self.pushes_enabled(account_id).await? {
            return Err(SyncError::NotConnected(format!(
                "outbound sync not enabled for {account_id}"
            )));
        }

        let mut outcome = BulkPushOutcome::default();
        for appointment in self.appointments.list_pushable(account_id).await? {
            match self.outbound.push(&appointment.id).await {
                Ok(_) => outcome.pushed += 1,
                Err(err) if err.is_terminal() => return Err(err),
                Err(err) => {
                    warn!(appointment_id = %appointment.id, error = %err, "bulk push failure");
                    outcome.failures.push((appointment.id, err));
                }
            }
        }
        Ok(outcome)
    }

    /// Pull externally-owned events for a window.
    pub async fn pull_window(&self, account_id: &str, window: TimeWindow) -> Result<PullOutcome> {
        if !self.pulls_enabled(account_id).await? {
            return Err(SyncError::NotConnected(format!(
                "inbound sync not enabled for {account_id}"
            )));
        }
        self.inbound.pull(account_id, window).await
    }

    /// Ensure a live watch channel for the account.
    pub async fn ensure_watch(&self, account_id: &str) -> Result<String> {
        if !self.pulls_enabled(account_id).await? {
            return Err(SyncError::NotConnected(format!(
                "inbound sync not enabled for {account_id}"
            )));
        }
        self.watch.ensure_channel(account_id).await
    }

    /// Dispatch a provider webhook notification to the right account.
    pub async fn handle_webhook(
        &self,
        channel_id: &str,
        resource_id: &str,
        resource_state: &str,
    ) -> Result<Option<PullOutcome>> {
        self.watch.handle_notification(channel_id, resource_id, resource_state).await
    }

    /// Disconnect the account's calendar: two phases, mark then sweep.
    ///
    /// Phase one sets `disconnect_pending`, which blocks all new sync work.
    /// Phase two deletes mappings, imported events, and finally the
    /// credential. A partial failure is surfaced; calling again resumes the
    /// sweep because the pending flag is already durable.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, account_id: &str) -> Result<()> {
        let _guard = self.locks.lock(account_id).await;

        let Some(record) = self.credentials.get(account_id).await? else {
            return Ok(());
        };

        self.credentials.set_disconnect_pending(account_id, true).await?;

        // Best effort: a revoked token must not block the local sweep.
        if let (Some(channel_id), Some(resource_id)) =
            (&record.watch_channel_id, &record.watch_resource_id)
        {
            if let Err(err) = self
                .api
                .stop_channel(&record.access_token, channel_id, resource_id)
                .await
            {
                warn!(account_id, error = %err, "failed to stop watch channel during disconnect");
            }
        }

        let removed_mappings = self.mappings.delete_all_for_account(account_id).await?;
        let removed_imports = self.imported.delete_all_for_account(account_id).await?;
        self.credentials.delete(account_id).await?;

        info!(account_id, removed_mappings, removed_imports, "calendar disconnected");
        Ok(())
    }

    /// Connection health summary for the dashboard surface.
    pub async fn connection_status(&self, account_id: &str) -> Result<ConnectionStatus> {
        let Some(record) = self.credentials.get(account_id).await? else {
            return Ok(ConnectionStatus::disconnected());
        };

        Ok(ConnectionStatus {
            connected: !record.disconnect_pending,
            calendar_id: Some(record.calendar_id),
            calendar_timezone: Some(record.calendar_timezone),
            sync_enabled: record.sync_enabled,
            last_full_sync_at: record.last_full_sync_at,
            mappings: self.mappings.count_by_state(account_id).await?,
            imported_events: self.imported.count_for_account(account_id).await?,
        })
    }

    async fn pushes_enabled(&self, account_id: &str) -> Result<bool> {
        Ok(self
            .credentials
            .get(account_id)
            .await?
            .is_some_and(|r| r.sync_enabled && !r.disconnect_pending && r.direction.pushes()))
    }

    async fn pulls_enabled(&self, account_id: &str) -> Result<bool> {
        Ok(self
            .credentials
            .get(account_id)
            .await?
            .is_some_and(|r| r.sync_enabled && !r.disconnect_pending && r.direction.pulls()))
    }
}
