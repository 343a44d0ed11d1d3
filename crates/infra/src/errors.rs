//! Conversions from external infrastructure errors into the sync error
//! taxonomy.

use clinsync_common::storage::StorageError;
use clinsync_domain::SyncError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SyncError);

impl From<InfraError> for SyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SyncError> for InfraError {
    fn from(value: SyncError) -> Self {
        Self(value)
    }
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let mapped = match value {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => SyncError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        SyncError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        SyncError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        SyncError::Database("foreign key constraint violation".into())
                    }
                    _ => SyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => SyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                SyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                SyncError::Database(format!("invalid column type: {ty}"))
            }
            other => SyncError::Database(other.to_string()),
        };

        Self(mapped)
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → SyncError */
/* -------------------------------------------------------------------------- */

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        let mapped = match value {
            StorageError::WrongKeyOrNotEncrypted => {
                SyncError::Config("SQLCipher key rejected or database not encrypted".into())
            }
            StorageError::InvalidConfig(msg) => SyncError::Config(msg),
            StorageError::Rusqlite(err) => return Self::from(err),
            other => SyncError::Database(other.to_string()),
        };
        Self(mapped)
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        Self(SyncError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        let mapped = if value.is_timeout() || value.is_connect() {
            SyncError::RemoteUnavailable(format!("provider unreachable: {value}"))
        } else if value.is_decode() {
            SyncError::RemoteRejected(format!("malformed provider response: {value}"))
        } else {
            SyncError::RemoteUnavailable(value.to_string())
        };
        Self(mapped)
    }
}
