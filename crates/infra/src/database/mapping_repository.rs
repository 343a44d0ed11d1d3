//! SqlCipher-backed implementation of the `EventMappingStore` port.
//!
//! The `appointment_id` primary key enforces the one-mapping-per-appointment
//! invariant; a duplicate insert surfaces as a constraint violation the
//! outbound syncer treats as a lost race.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinsync_common::storage::SqlCipherPool;
use clinsync_core::sync::EventMappingStore;
use clinsync_domain::{EventMapping, MappingCounts, Result, SyncError, SyncState};
use rusqlite::Row;
use tracing::instrument;

use super::{epoch_to_datetime, epoch_to_datetime_opt};
use crate::errors::InfraError;

/// SqlCipher implementation of `EventMappingStore`.
pub struct SqlCipherMappingRepository {
    pool: Arc<SqlCipherPool>,
}

impl SqlCipherMappingRepository {
    /// Create a new mapping repository.
    pub fn new(pool: Arc<SqlCipherPool>) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "appointment_id, account_id, external_event_id,
        external_calendar_id, sync_state, last_error, last_synced_at,
        local_modified_at, external_modified_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<EventMapping> {
    let state_raw: String = row.get(4)?;
    let sync_state = SyncState::parse(&state_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown sync state {state_raw:?}").into(),
        )
    })?;

    Ok(EventMapping {
        appointment_id: row.get(0)?,
        account_id: row.get(1)?,
        external_event_id: row.get(2)?,
        external_calendar_id: row.get(3)?,
        sync_state,
        last_error: row.get(5)?,
        last_synced_at: epoch_to_datetime_opt(6, row.get(6)?)?,
        local_modified_at: epoch_to_datetime(7, row.get(7)?)?,
        external_modified_at: epoch_to_datetime(8, row.get(8)?)?,
    })
}

#[async_trait]
impl EventMappingStore for SqlCipherMappingRepository {
    #[instrument(skip(self))]
    async fn find_by_appointment(&self, appointment_id: &str) -> Result<Option<EventMapping>> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM event_mappings WHERE appointment_id = ?1");
        Ok(conn.query_optional(&sql, &[&appointment_id], map_row).map_err(InfraError::from)?)
    }

    #[instrument(skip(self, mapping), fields(appointment_id = %mapping.appointment_id))]
    async fn insert(&self, mapping: &EventMapping) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        conn.execute(
            "INSERT INTO event_mappings (
                appointment_id, account_id, external_event_id,
                external_calendar_id, sync_state, last_error, last_synced_at,
                local_modified_at, external_modified_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            &[
                &mapping.appointment_id,
                &mapping.account_id,
                &mapping.external_event_id,
                &mapping.external_calendar_id,
                &mapping.sync_state.as_str(),
                &mapping.last_error,
                &mapping.last_synced_at.map(|t| t.timestamp()),
                &mapping.local_modified_at.timestamp(),
                &mapping.external_modified_at.timestamp(),
            ],
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn mark_synced(
        &self,
        appointment_id: &str,
        external_modified_at: DateTime<Utc>,
    ) -> Result<()> {
        self.set_state(
            appointment_id,
            SyncState::Synced,
            None,
            Some(external_modified_at),
        )
        .await
    }

    #[instrument(skip(self, message))]
    async fn mark_error(&self, appointment_id: &str, message: &str) -> Result<()> {
        self.set_state(appointment_id, SyncState::Error, Some(message), None).await
    }

    #[instrument(skip(self, message))]
    async fn mark_conflict(&self, appointment_id: &str, message: &str) -> Result<()> {
        self.set_state(appointment_id, SyncState::Conflict, Some(message), None).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, appointment_id: &str) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        conn.execute("DELETE FROM event_mappings WHERE appointment_id = ?1", &[&appointment_id])
            .map_err(InfraError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_for_account(&self, account_id: &str) -> Result<Vec<EventMapping>> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM event_mappings WHERE account_id = ?1");
        Ok(conn.query_map(&sql, &[&account_id], map_row).map_err(InfraError::from)?)
    }

    #[instrument(skip(self))]
    async fn external_event_ids(&self, account_id: &str) -> Result<HashSet<String>> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let ids = conn
            .query_map(
                "SELECT external_event_id FROM event_mappings WHERE account_id = ?1",
                &[&account_id],
                |row| row.get::<_, String>(0),
            )
            .map_err(InfraError::from)?;
        Ok(ids.into_iter().collect())
    }

    #[instrument(skip(self))]
    async fn count_by_state(&self, account_id: &str) -> Result<MappingCounts> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let rows = conn
            .query_map(
                "SELECT sync_state, COUNT(*) FROM event_mappings
                 WHERE account_id = ?1 GROUP BY sync_state",
                &[&account_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .map_err(InfraError::from)?;

        let mut counts = MappingCounts::default();
        for (state, count) in rows {
            let count = usize::try_from(count).unwrap_or(0);
            match SyncState::parse(&state) {
                Some(SyncState::Synced) => counts.synced = count,
                Some(SyncState::Pending) => counts.pending = count,
                Some(SyncState::Conflict) => counts.conflict = count,
                Some(SyncState::Error) => counts.error = count,
                None => {
                    return Err(SyncError::Database(format!("unknown sync state {state:?}")));
                }
            }
        }
        Ok(counts)
    }

    #[instrument(skip(self))]
    async fn delete_all_for_account(&self, account_id: &str) -> Result<usize> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let removed = conn
            .execute("DELETE FROM event_mappings WHERE account_id = ?1", &[&account_id])
            .map_err(InfraError::from)?;
        Ok(removed)
    }
}

impl SqlCipherMappingRepository {
    async fn set_state(
        &self,
        appointment_id: &str,
        state: SyncState,
        message: Option<&str>,
        external_modified_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let now = Utc::now().timestamp();
        let updated = match state {
            SyncState::Synced => conn
                .execute(
                    "UPDATE event_mappings
                     SET sync_state = ?2, last_error = NULL, last_synced_at = ?3,
                         external_modified_at = ?4
                     WHERE appointment_id = ?1",
                    &[
                        &appointment_id,
                        &state.as_str(),
                        &now,
                        &external_modified_at.map_or(now, |t| t.timestamp()),
                    ],
                )
                .map_err(InfraError::from)?,
            _ => conn
                .execute(
                    "UPDATE event_mappings
                     SET sync_state = ?2, last_error = ?3
                     WHERE appointment_id = ?1",
                    &[&appointment_id, &state.as_str(), &message],
                )
                .map_err(InfraError::from)?,
        };
        if updated == 0 {
            return Err(SyncError::NotFound(format!("mapping {appointment_id}")));
        }
        Ok(())
    }
}
