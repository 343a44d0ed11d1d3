//! Domain types for the sync engine

pub mod appointment;
pub mod credential;
pub mod external;
pub mod mapping;

pub use appointment::{Appointment, AppointmentStatus};
pub use credential::{CredentialRecord, SyncDirection};
pub use external::{
    CalendarIdentity, ConnectionStatus, ExternalEvent, ExternalEventDraft, ExternalEventStatus,
    MappingCounts, PullOutcome, ReminderOverride, TimeWindow, WatchChannel,
};
pub use mapping::{EventMapping, ImportedEvent, SyncState};
