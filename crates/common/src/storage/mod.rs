//! Encrypted storage layer
//!
//! SQLCipher-backed connection pooling shared by the infra repositories.

pub mod error;
pub mod pool;

pub use error::{StorageError, StorageResult};
pub use pool::{SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig};
