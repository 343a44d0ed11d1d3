//! Shared test helpers for `clinsync-core` integration tests.
//!
//! In-memory store mocks, a scripted calendar API fake, and a harness that
//! wires the full engine the way production wiring does, so tests focus on
//! behaviour instead of boilerplate.

pub mod api;
pub mod stores;

use std::sync::Arc;

use chrono::{Duration, Utc};
use clinsync_core::sync::{
    AccountLockRegistry, InboundImporter, OutboundSyncer, SyncOrchestrator, TokenManager,
    WatchChannelManager,
};
use clinsync_domain::{Appointment, AppointmentStatus, CredentialRecord, SyncDirection};

use api::FakeCalendarApi;
use stores::{
    InMemoryAppointmentStore, InMemoryCredentialStore, InMemoryEventMappingStore,
    InMemoryImportedEventStore,
};

/// Fully wired engine over in-memory stores and a scripted provider.
pub struct TestHarness {
    pub credentials: Arc<InMemoryCredentialStore>,
    pub mappings: Arc<InMemoryEventMappingStore>,
    pub imported: Arc<InMemoryImportedEventStore>,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub api: Arc<FakeCalendarApi>,
    pub outbound: Arc<OutboundSyncer>,
    pub inbound: Arc<InboundImporter>,
    pub watch: Arc<WatchChannelManager>,
    pub orchestrator: Arc<SyncOrchestrator>,
}

/// Wire up the engine exactly as the production composition does.
pub fn build_harness() -> TestHarness {
    let credentials = Arc::new(InMemoryCredentialStore::default());
    let mappings = Arc::new(InMemoryEventMappingStore::default());
    let imported = Arc::new(InMemoryImportedEventStore::default());
    let appointments = Arc::new(InMemoryAppointmentStore::default());
    let api = Arc::new(FakeCalendarApi::default());
    let locks = Arc::new(AccountLockRegistry::new());

    let tokens = Arc::new(TokenManager::new(credentials.clone(), api.clone()));
    let outbound = Arc::new(OutboundSyncer::new(
        appointments.clone(),
        mappings.clone(),
        tokens.clone(),
        api.clone(),
        locks.clone(),
    ));
    let inbound = Arc::new(InboundImporter::new(
        credentials.clone(),
        mappings.clone(),
        imported.clone(),
        tokens.clone(),
        api.clone(),
        locks.clone(),
    ));
    let watch = Arc::new(WatchChannelManager::new(
        credentials.clone(),
        tokens.clone(),
        api.clone(),
        inbound.clone(),
        locks.clone(),
        "https://clinic.example/webhooks/calendar".to_string(),
    ));
    let orchestrator = Arc::new(SyncOrchestrator::new(
        credentials.clone(),
        mappings.clone(),
        imported.clone(),
        appointments.clone(),
        outbound.clone(),
        inbound.clone(),
        watch.clone(),
        api.clone(),
        locks,
    ));

    TestHarness {
        credentials,
        mappings,
        imported,
        appointments,
        api,
        outbound,
        inbound,
        watch,
        orchestrator,
    }
}

/// Credential fixture: connected, bidirectional, token valid for an hour.
pub fn connected_credential(account_id: &str) -> CredentialRecord {
    CredentialRecord {
        account_id: account_id.to_string(),
        access_token: "access-0".into(),
        refresh_token: "refresh-0".into(),
        expires_at: Utc::now() + Duration::hours(1),
        scopes: "https://www.googleapis.com/auth/calendar".into(),
        calendar_id: "primary".into(),
        calendar_timezone: "America/Caracas".into(),
        sync_enabled: true,
        direction: SyncDirection::Bidirectional,
        last_full_sync_at: None,
        sync_cursor: None,
        watch_channel_id: None,
        watch_resource_id: None,
        watch_expires_at: None,
        disconnect_pending: false,
    }
}

/// Appointment fixture: confirmed, one hour long, starting tomorrow.
pub fn confirmed_appointment(id: &str, account_id: &str) -> Appointment {
    let start = Utc::now() + Duration::days(1);
    Appointment {
        id: id.to_string(),
        account_id: account_id.to_string(),
        patient_name: "María Pérez".into(),
        start,
        end: start + Duration::hours(1),
        status: AppointmentStatus::Confirmed,
        reason: Some("Consulta de control".into()),
        internal_notes: None,
        location: Some("Consultorio 3".into()),
        last_pushed_at: None,
    }
}
