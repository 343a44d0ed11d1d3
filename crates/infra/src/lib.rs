//! # ClinSync Infra
//!
//! Infrastructure adapters behind the core's port traits:
//! - `database`: SQLCipher repositories for credentials, mappings,
//!   imported events, and appointments
//! - `google`: Google Calendar v3 client and OAuth consent flow
//! - `webhook`: axum receiver for provider push notifications
//! - `config`: environment and TOML configuration loading

pub mod config;
pub mod database;
pub mod errors;
pub mod google;
pub mod webhook;

pub use errors::InfraError;
