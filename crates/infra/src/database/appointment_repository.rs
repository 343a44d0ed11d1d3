//! SqlCipher-backed implementation of the `AppointmentStore` port.
//!
//! Appointments are owned by the scheduling subsystem; this repository
//! reads them and writes back only the `last_pushed_at` marker.

use std::sync::Arc;

use async_trait::async_trait;
use clinsync_common::storage::SqlCipherPool;
use clinsync_core::sync::AppointmentStore;
use clinsync_domain::{Appointment, AppointmentStatus, Result, SyncError};
use rusqlite::Row;
use tracing::instrument;

use super::epoch_to_datetime;
use crate::errors::InfraError;

/// SqlCipher implementation of `AppointmentStore`.
pub struct SqlCipherAppointmentRepository {
    pool: Arc<SqlCipherPool>,
}

impl SqlCipherAppointmentRepository {
    /// Create a new appointment repository.
    pub fn new(pool: Arc<SqlCipherPool>) -> Self {
        Self { pool }
    }

    /// Insert or replace an appointment row. Used by the scheduling side
    /// and by tests; the sync engine itself never creates appointments.
    pub fn upsert(&self, appointment: &Appointment) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        conn.execute(
            "INSERT INTO appointments (
                id, account_id, patient_name, start_ts, end_ts, status,
                reason, internal_notes, location, last_pushed_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                account_id = excluded.account_id,
                patient_name = excluded.patient_name,
                start_ts = excluded.start_ts,
                end_ts = excluded.end_ts,
                status = excluded.status,
                reason = excluded.reason,
                internal_notes = excluded.internal_notes,
                location = excluded.location",
            &[
                &appointment.id,
                &appointment.account_id,
                &appointment.patient_name,
                &appointment.start.timestamp(),
                &appointment.end.timestamp(),
                &appointment.status.as_str(),
                &appointment.reason,
                &appointment.internal_notes,
                &appointment.location,
                &appointment.last_pushed_at,
            ],
        )
        .map_err(InfraError::from)?;
        Ok(())
    }
}

const SELECT_COLUMNS: &str = "id, account_id, patient_name, start_ts, end_ts, status,
        reason, internal_notes, location, last_pushed_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let status_raw: String = row.get(5)?;
    let status = AppointmentStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown appointment status {status_raw:?}").into(),
        )
    })?;

    Ok(Appointment {
        id: row.get(0)?,
        account_id: row.get(1)?,
        patient_name: row.get(2)?,
        start: epoch_to_datetime(3, row.get(3)?)?,
        end: epoch_to_datetime(4, row.get(4)?)?,
        status,
        reason: row.get(6)?,
        internal_notes: row.get(7)?,
        location: row.get(8)?,
        last_pushed_at: row.get(9)?,
    })
}

#[async_trait]
impl AppointmentStore for SqlCipherAppointmentRepository {
    #[instrument(skip(self))]
    async fn get(&self, appointment_id: &str) -> Result<Option<Appointment>> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM appointments WHERE id = ?1");
        Ok(conn.query_optional(&sql, &[&appointment_id], map_row).map_err(InfraError::from)?)
    }

    #[instrument(skip(self))]
    async fn list_pushable(&self, account_id: &str) -> Result<Vec<Appointment>> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM appointments
             WHERE account_id = ?1
               AND status NOT IN ('cancelled', 'declined', 'no_show')
             ORDER BY start_ts"
        );
        Ok(conn.query_map(&sql, &[&account_id], map_row).map_err(InfraError::from)?)
    }

    #[instrument(skip(self))]
    async fn set_last_pushed(&self, appointment_id: &str, at: i64) -> Result<()> {
        let conn = self.pool.get_connection().map_err(InfraError::from)?;
        let updated = conn
            .execute(
                "UPDATE appointments SET last_pushed_at = ?2 WHERE id = ?1",
                &[&appointment_id, &at],
            )
            .map_err(InfraError::from)?;
        if updated == 0 {
            return Err(SyncError::NotFound(format!("appointment {appointment_id}")));
        }
        Ok(())
    }
}
