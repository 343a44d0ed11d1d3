//! # ClinSync Domain
//!
//! Pure domain types for the clinician calendar sync engine: appointments,
//! credentials, event mappings, imported events, and the error taxonomy.
//! No I/O, no infrastructure dependencies.

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

pub use config::{Config, DatabaseConfig, GoogleConfig, WebhookConfig};
pub use errors::{Result, SyncError};
pub use types::{
    Appointment, AppointmentStatus, CalendarIdentity, ConnectionStatus, CredentialRecord,
    EventMapping, ExternalEvent, ExternalEventDraft, ExternalEventStatus, ImportedEvent,
    MappingCounts, PullOutcome, ReminderOverride, SyncDirection, SyncState, TimeWindow,
    WatchChannel,
};
