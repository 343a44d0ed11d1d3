//! SQLCipher-backed implementations of the core storage ports.

pub mod appointment_repository;
pub mod credential_repository;
pub mod imported_event_repository;
pub mod manager;
pub mod mapping_repository;

pub use appointment_repository::SqlCipherAppointmentRepository;
pub use credential_repository::SqlCipherCredentialRepository;
pub use imported_event_repository::SqlCipherImportedEventRepository;
pub use manager::DbManager;
pub use mapping_repository::SqlCipherMappingRepository;

use chrono::{DateTime, TimeZone, Utc};

/// Convert an epoch-seconds column into a UTC timestamp inside a row
/// mapping closure.
pub(crate) fn epoch_to_datetime(idx: usize, secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Integer,
            format!("timestamp {secs} out of range").into(),
        )
    })
}

/// Optional variant of [`epoch_to_datetime`].
pub(crate) fn epoch_to_datetime_opt(
    idx: usize,
    secs: Option<i64>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    secs.map(|s| epoch_to_datetime(idx, s)).transpose()
}
