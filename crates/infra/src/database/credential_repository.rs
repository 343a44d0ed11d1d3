//! SqlCipher-backed implementation of the `CredentialStore` port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinsync_common::storage::SqlCipherPool;
use clinsync_core::sync::CredentialStore;
use clinsync_domain::{CredentialRecord, Result, SyncDirection, SyncError, WatchChannel};
use rusqlite::Row;
use tracing::instrument;

use super::{epoch_to_datetime, epoch_to_datetime_opt};
use crate::errors::InfraError;

/// SqlCipher implementation of `CredentialStore`, one row per account.
pub struct SqlCipherCredentialRepository {
    pool: Arc<SqlCipherPool>,
}

impl SqlCipherCredentialRepository {
    /// Create a new credential repository.
    pub fn new(pool: Arc<SqlCipherPool>) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "account_id, access_token, refresh_token, expires_at, scopes,
        calendar_id, calendar_timezone, sync_enabled, direction,
        last_full_sync_at, sync_cursor, watch_channel_id, watch_resource_id,
        watch_expires_at, disconnect_pending";

fn map_row(row: &Row<'_>) -> rusqlite::Result<CredentialRecord> {
    let direction_raw: String = row.get(8)?;
    let direction = SyncDirection::parse(&direction_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            format!("unknown sync direction {direction_raw:?}").into(),
        )
    })?;

    Ok(CredentialRecord {
        account_id: row.get(0)?,
        access_token: row.get(1)?,
        refresh_token: row.get(2)?,
        expires_at: epoch_to_datetime(3, row.get(3)?)?,
        scopes: row.get(4)?,
        calendar_id: row.get(5)?,
        calendar_timezone: row.get(6)?,
        sync_enabled: row.get(7)?,
        direction,
        last_full_sync_at: epoch_to_datetime_opt(9, row.get(9)?)?,
        sync_cursor: row.get(10)?,
        watch_channel_id: row.get(11)?,
        watch_resource_id: row.get(12)?,
        watch_expires_at: epoch_to_datetime_opt(13, row.get(13)?)?,
        disconnect_pending: row.get(14)?,
    })
}

#[async_trait]
impl CredentialStore for SqlCipherCredentialRepository {
    #[instrument(skip(self))]
    async fn get(&self, account_id: &str) -> Result<Option<CredentialRecord>> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM calendar_credentials WHERE account_id = ?1");
        Ok(conn.query_optional(&sql, &[&account_id], map_row).map_err(InfraError::from)?)
    }

    #[instrument(skip(self, record), fields(account_id = %record.account_id))]
    async fn upsert(&self, record: &CredentialRecord) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        conn.execute(
            "INSERT INTO calendar_credentials (
                account_id, access_token, refresh_token, expires_at, scopes,
                calendar_id, calendar_timezone, sync_enabled, direction,
                last_full_sync_at, sync_cursor, watch_channel_id,
                watch_resource_id, watch_expires_at, disconnect_pending,
                updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT(account_id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                scopes = excluded.scopes,
                calendar_id = excluded.calendar_id,
                calendar_timezone = excluded.calendar_timezone,
                sync_enabled = excluded.sync_enabled,
                direction = excluded.direction,
                last_full_sync_at = excluded.last_full_sync_at,
                sync_cursor = excluded.sync_cursor,
                watch_channel_id = excluded.watch_channel_id,
                watch_resource_id = excluded.watch_resource_id,
                watch_expires_at = excluded.watch_expires_at,
                disconnect_pending = excluded.disconnect_pending,
                updated_at = excluded.updated_at",
            &[
                &record.account_id,
                &record.access_token,
                &record.refresh_token,
                &record.expires_at.timestamp(),
                &record.scopes,
                &record.calendar_id,
                &record.calendar_timezone,
                &record.sync_enabled,
                &record.direction.as_str(),
                &record.last_full_sync_at.map(|t| t.timestamp()),
                &record.sync_cursor,
                &record.watch_channel_id,
                &record.watch_resource_id,
                &record.watch_expires_at.map(|t| t.timestamp()),
                &record.disconnect_pending,
                &Utc::now().timestamp(),
            ],
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    #[instrument(skip(self, access_token))]
    async fn update_access_token(
        &self,
        account_id: &str,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let updated = conn
            .execute(
                "UPDATE calendar_credentials
                 SET access_token = ?2, expires_at = ?3, updated_at = ?4
                 WHERE account_id = ?1",
                &[&account_id, &access_token, &expires_at.timestamp(), &Utc::now().timestamp()],
            )
            .map_err(InfraError::from)?;
        if updated == 0 {
            return Err(SyncError::NotFound(format!("credential {account_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self, channel))]
    async fn update_watch_channel(
        &self,
        account_id: &str,
        channel: Option<&WatchChannel>,
    ) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let updated = conn
            .execute(
                "UPDATE calendar_credentials
                 SET watch_channel_id = ?2, watch_resource_id = ?3,
                     watch_expires_at = ?4, updated_at = ?5
                 WHERE account_id = ?1",
                &[
                    &account_id,
                    &channel.map(|c| c.channel_id.clone()),
                    &channel.map(|c| c.resource_id.clone()),
                    &channel.map(|c| c.expires_at.timestamp()),
                    &Utc::now().timestamp(),
                ],
            )
            .map_err(InfraError::from)?;
        if updated == 0 {
            return Err(SyncError::NotFound(format!("credential {account_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn mark_full_sync(
        &self,
        account_id: &str,
        at: DateTime<Utc>,
        cursor: Option<&str>,
    ) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        conn.execute(
            "UPDATE calendar_credentials
             SET last_full_sync_at = ?2, sync_cursor = ?3, updated_at = ?4
             WHERE account_id = ?1",
            &[&account_id, &at.timestamp(), &cursor, &Utc::now().timestamp()],
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_disconnect_pending(&self, account_id: &str, pending: bool) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let updated = conn
            .execute(
                "UPDATE calendar_credentials
                 SET disconnect_pending = ?2, updated_at = ?3
                 WHERE account_id = ?1",
                &[&account_id, &pending, &Utc::now().timestamp()],
            )
            .map_err(InfraError::from)?;
        if updated == 0 {
            return Err(SyncError::NotFound(format!("credential {account_id}")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_watch_channel(&self, channel_id: &str) -> Result<Option<CredentialRecord>> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let sql =
            format!("SELECT {SELECT_COLUMNS} FROM calendar_credentials WHERE watch_channel_id = ?1");
        Ok(conn.query_optional(&sql, &[&channel_id], map_row).map_err(InfraError::from)?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, account_id: &str) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        conn.execute("DELETE FROM calendar_credentials WHERE account_id = ?1", &[&account_id])
            .map_err(InfraError::from)?;
        Ok(())
    }
}
