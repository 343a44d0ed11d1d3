//! In-memory mock implementations of the engine's storage ports.
//!
//! Deterministic, thread-safe, and faithful to the contracts the SQL
//! repositories honour, including the duplicate-insert failure on the
//! mapping table.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinsync_core::sync::{
    AppointmentStore, CredentialStore, EventMappingStore, ImportedEventStore,
};
use clinsync_domain::{
    Appointment, CredentialRecord, EventMapping, ImportedEvent, MappingCounts,
    Result as SyncResult, SyncError, SyncState, TimeWindow, WatchChannel,
};

/// In-memory mock for `CredentialStore`, one record per account id.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    rows: Arc<Mutex<HashMap<String, CredentialRecord>>>,
}

impl InMemoryCredentialStore {
    /// Seed a credential row.
    pub fn seed(&self, record: CredentialRecord) {
        self.rows.lock().unwrap().insert(record.account_id.clone(), record);
    }

    /// Snapshot a row for assertions.
    pub fn snapshot(&self, account_id: &str) -> Option<CredentialRecord> {
        self.rows.lock().unwrap().get(account_id).cloned()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, account_id: &str) -> SyncResult<Option<CredentialRecord>> {
        Ok(self.rows.lock().unwrap().get(account_id).cloned())
    }

    async fn upsert(&self, record: &CredentialRecord) -> SyncResult<()> {
        self.rows.lock().unwrap().insert(record.account_id.clone(), record.clone());
        Ok(())
    }

    async fn update_access_token(
        &self,
        account_id: &str,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let record = rows
            .get_mut(account_id)
            .ok_or_else(|| SyncError::NotFound(format!("credential {account_id}")))?;
        record.access_token = access_token.to_string();
        record.expires_at = expires_at;
        Ok(())
    }

    async fn update_watch_channel(
        &self,
        account_id: &str,
        channel: Option<&WatchChannel>,
    ) -> SyncResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let record = rows
            .get_mut(account_id)
            .ok_or_else(|| SyncError::NotFound(format!("credential {account_id}")))?;
        match channel {
            Some(channel) => {
                record.watch_channel_id = Some(channel.channel_id.clone());
                record.watch_resource_id = Some(channel.resource_id.clone());
                record.watch_expires_at = Some(channel.expires_at);
            }
            None => {
                record.watch_channel_id = None;
                record.watch_resource_id = None;
                record.watch_expires_at = None;
            }
        }
        Ok(())
    }

    async fn mark_full_sync(
        &self,
        account_id: &str,
        at: DateTime<Utc>,
        cursor: Option<&str>,
    ) -> SyncResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let record = rows
            .get_mut(account_id)
            .ok_or_else(|| SyncError::NotFound(format!("credential {account_id}")))?;
        record.last_full_sync_at = Some(at);
        record.sync_cursor = cursor.map(ToString::to_string);
        Ok(())
    }

    async fn set_disconnect_pending(&self, account_id: &str, pending: bool) -> SyncResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let record = rows
            .get_mut(account_id)
            .ok_or_else(|| SyncError::NotFound(format!("credential {account_id}")))?;
        record.disconnect_pending = pending;
        Ok(())
    }

    async fn find_by_watch_channel(
        &self,
        channel_id: &str,
    ) -> SyncResult<Option<CredentialRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|r| r.watch_channel_id.as_deref() == Some(channel_id))
            .cloned())
    }

    async fn delete(&self, account_id: &str) -> SyncResult<()> {
        self.rows.lock().unwrap().remove(account_id);
        Ok(())
    }
}

/// In-memory mock for `EventMappingStore`, keyed by appointment id.
///
/// `insert` fails on a duplicate appointment id, matching the SQL table's
/// uniqueness constraint.
#[derive(Default)]
pub struct InMemoryEventMappingStore {
    rows: Arc<Mutex<HashMap<String, EventMapping>>>,
}

impl InMemoryEventMappingStore {
    /// Seed a mapping row.
    pub fn seed(&self, mapping: EventMapping) {
        self.rows.lock().unwrap().insert(mapping.appointment_id.clone(), mapping);
    }

    /// Snapshot a row for assertions.
    pub fn snapshot(&self, appointment_id: &str) -> Option<EventMapping> {
        self.rows.lock().unwrap().get(appointment_id).cloned()
    }

    /// Total number of mapping rows across all accounts.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl EventMappingStore for InMemoryEventMappingStore {
    async fn find_by_appointment(&self, appointment_id: &str) -> SyncResult<Option<EventMapping>> {
        Ok(self.rows.lock().unwrap().get(appointment_id).cloned())
    }

    async fn insert(&self, mapping: &EventMapping) -> SyncResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&mapping.appointment_id) {
            return Err(SyncError::Database(format!(
                "unique constraint violation: mapping for {}",
                mapping.appointment_id
            )));
        }
        rows.insert(mapping.appointment_id.clone(), mapping.clone());
        Ok(())
    }

    async fn mark_synced(
        &self,
        appointment_id: &str,
        external_modified_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let mapping = rows
            .get_mut(appointment_id)
            .ok_or_else(|| SyncError::NotFound(format!("mapping {appointment_id}")))?;
        mapping.sync_state = SyncState::Synced;
        mapping.last_error = None;
        mapping.last_synced_at = Some(Utc::now());
        mapping.external_modified_at = external_modified_at;
        Ok(())
    }

    async fn mark_error(&self, appointment_id: &str, message: &str) -> SyncResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let mapping = rows
            .get_mut(appointment_id)
            .ok_or_else(|| SyncError::NotFound(format!("mapping {appointment_id}")))?;
        mapping.sync_state = SyncState::Error;
        mapping.last_error = Some(message.to_string());
        Ok(())
    }

    async fn mark_conflict(&self, appointment_id: &str, message: &str) -> SyncResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let mapping = rows
            .get_mut(appointment_id)
            .ok_or_else(|| SyncError::NotFound(format!("mapping {appointment_id}")))?;
        mapping.sync_state = SyncState::Conflict;
        mapping.last_error = Some(message.to_string());
        Ok(())
    }

    async fn delete(&self, appointment_id: &str) -> SyncResult<()> {
        self.rows.lock().unwrap().remove(appointment_id);
        Ok(())
    }

    async fn list_for_account(&self, account_id: &str) -> SyncResult<Vec<EventMapping>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn external_event_ids(&self, account_id: &str) -> SyncResult<HashSet<String>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.account_id == account_id)
            .map(|m| m.external_event_id.clone())
            .collect())
    }

    async fn count_by_state(&self, account_id: &str) -> SyncResult<MappingCounts> {
        let rows = self.rows.lock().unwrap();
        let mut counts = MappingCounts::default();
        for mapping in rows.values().filter(|m| m.account_id == account_id) {
            match mapping.sync_state {
                SyncState::Synced => counts.synced += 1,
                SyncState::Pending => counts.pending += 1,
                SyncState::Conflict => counts.conflict += 1,
                SyncState::Error => counts.error += 1,
            }
        }
        Ok(counts)
    }

    async fn delete_all_for_account(&self, account_id: &str) -> SyncResult<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, m| m.account_id != account_id);
        Ok(before - rows.len())
    }
}

/// In-memory mock for `ImportedEventStore`.
#[derive(Default)]
pub struct InMemoryImportedEventStore {
    rows: Arc<Mutex<Vec<ImportedEvent>>>,
}

impl InMemoryImportedEventStore {
    /// All rows, for assertions.
    pub fn all(&self) -> Vec<ImportedEvent> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImportedEventStore for InMemoryImportedEventStore {
    async fn upsert(&self, event: &ImportedEvent) -> SyncResult<()> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|e| {
            !(e.account_id == event.account_id
                && e.external_calendar_id == event.external_calendar_id
                && e.external_event_id == event.external_event_id)
        });
        rows.push(event.clone());
        Ok(())
    }

    async fn list_window(
        &self,
        account_id: &str,
        window: TimeWindow,
    ) -> SyncResult<Vec<ImportedEvent>> {
        let mut events: Vec<ImportedEvent> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.account_id == account_id && window.overlaps(e.start, e.end))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    async fn prune_absent(
        &self,
        account_id: &str,
        calendar_id: &str,
        window: TimeWindow,
        seen: &HashSet<String>,
    ) -> SyncResult<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|e| {
            !(e.account_id == account_id
                && e.external_calendar_id == calendar_id
                && window.overlaps(e.start, e.end)
                && !seen.contains(&e.external_event_id))
        });
        Ok(before - rows.len())
    }

    async fn count_for_account(&self, account_id: &str) -> SyncResult<usize> {
        Ok(self.rows.lock().unwrap().iter().filter(|e| e.account_id == account_id).count())
    }

    async fn delete_all_for_account(&self, account_id: &str) -> SyncResult<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|e| e.account_id != account_id);
        Ok(before - rows.len())
    }
}

/// In-memory mock for `AppointmentStore`.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    rows: Arc<Mutex<HashMap<String, Appointment>>>,
}

impl InMemoryAppointmentStore {
    /// Seed an appointment row.
    pub fn seed(&self, appointment: Appointment) {
        self.rows.lock().unwrap().insert(appointment.id.clone(), appointment);
    }

    /// Snapshot a row for assertions.
    pub fn snapshot(&self, appointment_id: &str) -> Option<Appointment> {
        self.rows.lock().unwrap().get(appointment_id).cloned()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn get(&self, appointment_id: &str) -> SyncResult<Option<Appointment>> {
        Ok(self.rows.lock().unwrap().get(appointment_id).cloned())
    }

    async fn list_pushable(&self, account_id: &str) -> SyncResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.account_id == account_id && a.status.is_pushable())
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.start);
        Ok(appointments)
    }

    async fn set_last_pushed(&self, appointment_id: &str, at: i64) -> SyncResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let appointment = rows
            .get_mut(appointment_id)
            .ok_or_else(|| SyncError::NotFound(format!("appointment {appointment_id}")))?;
        appointment.last_pushed_at = Some(at);
        Ok(())
    }
}
