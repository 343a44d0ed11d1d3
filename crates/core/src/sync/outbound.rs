//! Outbound push of appointments to the external calendar.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use clinsync_domain::{EventMapping, Result, SyncError, SyncState};

use super::locks::AccountLockRegistry;
use super::ports::{AppointmentStore, CalendarApi, EventMappingStore};
use super::token::TokenManager;
use super::translator;

/// Pushes a single appointment's create/update/delete to the provider,
/// keeping the mapping table accurate on every path.
pub struct OutboundSyncer {
    appointments: Arc<dyn AppointmentStore>,
    mappings: Arc<dyn EventMappingStore>,
    tokens: Arc<TokenManager>,
    api: Arc<dyn CalendarApi>,
    locks: Arc<AccountLockRegistry>,
}

impl OutboundSyncer {
    /// Wire up a syncer over the shared stores and lock registry.
    #[must_use]
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        mappings: Arc<dyn EventMappingStore>,
        tokens: Arc<TokenManager>,
        api: Arc<dyn CalendarApi>,
        locks: Arc<AccountLockRegistry>,
    ) -> Self {
        Self { appointments, mappings, tokens, api, locks }
    }

    /// Push an appointment, refusing mappings flagged as conflicted.
    ///
    /// Used by scheduled and operator-triggered syncs: a conflict must be
    /// resolved by an explicit local edit, which goes through
    /// [`Self::push_overwriting`].
    #[instrument(skip(self))]
    pub async fn push(&self, appointment_id: &str) -> Result<String> {
        self.push_inner(appointment_id, false).await
    }

    /// Push an appointment after a local mutation. Last writer wins: a
    /// conflicted mapping is overwritten remotely and the flag cleared.
    #[instrument(skip(self))]
    pub async fn push_overwriting(&self, appointment_id: &str) -> Result<String> {
        self.push_inner(appointment_id, true).await
    }

    async fn push_inner(&self, appointment_id: &str, overwrite_conflict: bool) -> Result<String> {
        let appointment = self
            .appointments
            .get(appointment_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("appointment {appointment_id}")))?;

        let _guard = self.locks.lock(&appointment.account_id).await;
        let auth = self.tokens.authorized(&appointment.account_id).await?;
        let draft = translator::appointment_to_draft(&appointment, &auth.calendar_timezone)?;

        // Existence is re-checked under the lock so a delayed push cannot
        // resurrect an appointment that was removed meanwhile.
        let existing = self.mappings.find_by_appointment(appointment_id).await?;

        let external_event_id = match existing {
            Some(mapping) => {
                if mapping.sync_state == SyncState::Conflict && !overwrite_conflict {
                    return Err(SyncError::MappingConflict(format!(
                        "appointment {appointment_id} changed both locally and remotely"
                    )));
                }

                match self
                    .api
                    .update_event(
                        &auth.access_token,
                        &mapping.external_calendar_id,
                        &mapping.external_event_id,
                        &draft,
                    )
                    .await
                {
                    Ok(()) => {
                        self.mappings.mark_synced(appointment_id, Utc::now()).await?;
                        debug!(appointment_id, external_event_id = %mapping.external_event_id, "updated remote event");
                        mapping.external_event_id
                    }
                    Err(err) => {
                        // The previous external id stays on the row so a
                        // retry targets the same remote object.
                        self.mappings.mark_error(appointment_id, &err.to_string()).await?;
                        return Err(err);
                    }
                }
            }
            None => {
                let event_id = self
                    .api
                    .create_event(&auth.access_token, &auth.calendar_id, &draft)
                    .await?;

                let mapping = EventMapping::synced(
                    &appointment.account_id,
                    appointment_id,
                    &event_id,
                    &auth.calendar_id,
                );

                if let Err(insert_err) = self.mappings.insert(&mapping).await {
                    // Lost a first-push race: another writer mapped this
                    // appointment between our check and insert. Keep their
                    // row, drop our remote duplicate best-effort.
                    if let Some(winner) =
                        self.mappings.find_by_appointment(appointment_id).await?
                    {
                        warn!(
                            appointment_id,
                            duplicate_event_id = %event_id,
                            "concurrent first push detected, removing duplicate remote event"
                        );
                        if let Err(cleanup_err) = self
                            .api
                            .delete_event(&auth.access_token, &auth.calendar_id, &event_id)
                            .await
                        {
                            warn!(appointment_id, error = %cleanup_err, "failed to remove duplicate remote event");
                        }
                        winner.external_event_id
                    } else {
                        return Err(insert_err);
                    }
                } else {
                    info!(appointment_id, external_event_id = %event_id, "created remote event");
                    event_id
                }
            }
        };

        self.appointments.set_last_pushed(appointment_id, Utc::now().timestamp()).await?;
        Ok(external_event_id)
    }

    /// Delete the remote event for an appointment.
    ///
    /// An appointment that was never synced has no mapping and nothing to
    /// delete; the call succeeds without touching the provider. Works even
    /// after the appointment row itself is gone.
    #[instrument(skip(self))]
    pub async fn remove(&self, appointment_id: &str) -> Result<()> {
        let Some(mapping) = self.mappings.find_by_appointment(appointment_id).await? else {
            debug!(appointment_id, "never synced, nothing to delete");
            return Ok(());
        };

        let _guard = self.locks.lock(&mapping.account_id).await;

        // Re-read under the lock: a concurrent remove may have finished.
        let Some(mapping) = self.mappings.find_by_appointment(appointment_id).await? else {
            return Ok(());
        };

        let auth = self.tokens.authorized(&mapping.account_id).await?;

        match self
            .api
            .delete_event(
                &auth.access_token,
                &mapping.external_calendar_id,
                &mapping.external_event_id,
            )
            .await
        {
            Ok(()) => {
                self.mappings.delete(appointment_id).await?;
                info!(appointment_id, external_event_id = %mapping.external_event_id, "deleted remote event and mapping");
                Ok(())
            }
            Err(err) => {
                self.mappings.mark_error(appointment_id, &err.to_string()).await?;
                Err(err)
            }
        }
    }
}
