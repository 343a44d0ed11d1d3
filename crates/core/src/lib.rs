//! Application core for the clinic calendar sync service.
//!
//! Holds the sync engine and its port definitions. Adapters (database,
//! Google client, webhook server) live in `clinsync-infra` and plug in
//! through the traits exported here.

pub mod sync;

pub use sync::{
    AccountLockRegistry, AppointmentStore, AuthorizedAccount, BulkPushOutcome, CalendarApi,
    CredentialStore, EventMappingStore, EventPage, ImportedEventStore, InboundImporter,
    OutboundSyncer, RefreshedToken, SyncOrchestrator, TokenManager, WatchChannelManager,
};
