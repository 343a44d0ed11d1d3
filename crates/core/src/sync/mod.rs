//! Calendar synchronization engine.
//!
//! Pure logic plus the port traits the storage and provider adapters
//! implement. Nothing in here talks to SQLite or HTTP directly.

pub mod inbound;
pub mod locks;
pub mod orchestrator;
pub mod outbound;
pub mod ports;
pub mod token;
pub mod translator;
pub mod watch;

pub use inbound::InboundImporter;
pub use locks::AccountLockRegistry;
pub use orchestrator::{BulkPushOutcome, SyncOrchestrator};
pub use outbound::OutboundSyncer;
pub use ports::{
    AppointmentStore, CalendarApi, CredentialStore, EventMappingStore, EventPage,
    ImportedEventStore, RefreshedToken,
};
pub use token::{AuthorizedAccount, TokenManager};
pub use translator::appointment_to_draft;
pub use watch::WatchChannelManager;
