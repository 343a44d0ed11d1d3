//! # ClinSync Common
//!
//! Infrastructure-free shared utilities:
//! - `storage`: SQLCipher connection pool (rusqlite + r2d2)
//! - `retry`: exponential backoff policy for remote calls
//! - `telemetry`: tracing subscriber setup

pub mod retry;
pub mod storage;
pub mod telemetry;

pub use retry::RetryPolicy;
pub use storage::{SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig};
