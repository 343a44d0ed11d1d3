//! SqlCipher-backed implementation of the `ImportedEventStore` port.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use clinsync_common::storage::SqlCipherPool;
use clinsync_core::sync::ImportedEventStore;
use clinsync_domain::{ImportedEvent, Result, TimeWindow};
use rusqlite::Row;
use tracing::instrument;

use super::{epoch_to_datetime, epoch_to_datetime_opt};
use crate::errors::InfraError;

/// SqlCipher implementation of `ImportedEventStore`.
pub struct SqlCipherImportedEventRepository {
    pool: Arc<SqlCipherPool>,
}

impl SqlCipherImportedEventRepository {
    /// Create a new imported-event repository.
    pub fn new(pool: Arc<SqlCipherPool>) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "account_id, external_calendar_id, external_event_id, title,
        description, start_ts, end_ts, is_all_day, location,
        external_modified_at, last_synced_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<ImportedEvent> {
    Ok(ImportedEvent {
        account_id: row.get(0)?,
        external_calendar_id: row.get(1)?,
        external_event_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        start: epoch_to_datetime(5, row.get(5)?)?,
        end: epoch_to_datetime(6, row.get(6)?)?,
        all_day: row.get(7)?,
        location: row.get(8)?,
        external_modified_at: epoch_to_datetime_opt(9, row.get(9)?)?,
        last_synced_at: epoch_to_datetime(10, row.get(10)?)?,
    })
}

#[async_trait]
impl ImportedEventStore for SqlCipherImportedEventRepository {
    #[instrument(skip(self, event), fields(external_event_id = %event.external_event_id))]
    async fn upsert(&self, event: &ImportedEvent) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        conn.execute(
            "INSERT INTO imported_events (
                account_id, external_calendar_id, external_event_id, title,
                description, start_ts, end_ts, is_all_day, location,
                external_modified_at, last_synced_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(account_id, external_calendar_id, external_event_id)
             DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                start_ts = excluded.start_ts,
                end_ts = excluded.end_ts,
                is_all_day = excluded.is_all_day,
                location = excluded.location,
                external_modified_at = excluded.external_modified_at,
                last_synced_at = excluded.last_synced_at",
            &[
                &event.account_id,
                &event.external_calendar_id,
                &event.external_event_id,
                &event.title,
                &event.description,
                &event.start.timestamp(),
                &event.end.timestamp(),
                &event.all_day,
                &event.location,
                &event.external_modified_at.map(|t| t.timestamp()),
                &event.last_synced_at.timestamp(),
            ],
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_window(
        &self,
        account_id: &str,
        window: TimeWindow,
    ) -> Result<Vec<ImportedEvent>> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM imported_events
             WHERE account_id = ?1 AND start_ts < ?2 AND end_ts > ?3
             ORDER BY start_ts"
        );
        Ok(conn
            .query_map(
                &sql,
                &[&account_id, &window.to.timestamp(), &window.from.timestamp()],
                map_row,
            )
            .map_err(InfraError::from)?)
    }

    #[instrument(skip(self, seen), fields(seen = seen.len()))]
    async fn prune_absent(
        &self,
        account_id: &str,
        calendar_id: &str,
        window: TimeWindow,
        seen: &HashSet<String>,
    ) -> Result<usize> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;

        // Ids still present in the feed survive; everything else inside the
        // window goes. The seen set is matched in Rust to avoid building an
        // unbounded IN clause.
        let candidates = conn
            .query_map(
                "SELECT external_event_id FROM imported_events
                 WHERE account_id = ?1 AND external_calendar_id = ?2
                   AND start_ts < ?3 AND end_ts > ?4",
                &[
                    &account_id,
                    &calendar_id,
                    &window.to.timestamp(),
                    &window.from.timestamp(),
                ],
                |row| row.get::<_, String>(0),
            )
            .map_err(InfraError::from)?;

        let mut pruned = 0;
        for event_id in candidates.into_iter().filter(|id| !seen.contains(id)) {
            pruned += conn
                .execute(
                    "DELETE FROM imported_events
                     WHERE account_id = ?1 AND external_calendar_id = ?2
                       AND external_event_id = ?3",
                    &[&account_id, &calendar_id, &event_id],
                )
                .map_err(InfraError::from)?;
        }
        Ok(pruned)
    }

    #[instrument(skip(self))]
    async fn count_for_account(&self, account_id: &str) -> Result<usize> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM imported_events WHERE account_id = ?1",
                &[&account_id],
                |row| row.get(0),
            )
            .map_err(InfraError::from)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    #[instrument(skip(self))]
    async fn delete_all_for_account(&self, account_id: &str) -> Result<usize> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let removed = conn
            .execute("DELETE FROM imported_events WHERE account_id = ?1", &[&account_id])
            .map_err(InfraError::from)?;
        Ok(removed)
    }
}
