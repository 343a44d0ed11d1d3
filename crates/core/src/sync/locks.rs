//! Per-account mutual exclusion.
//!
//! Sync work for different accounts runs concurrently without coordination;
//! work for the same account is serialized. Any sequence of
//! {read credential, maybe refresh, write credential} or
//! {read mapping, call provider, write mapping} must run under the
//! account's lock, released on every exit path by guard scope.
//!
//! In-process only. A multi-instance deployment swaps this type for a
//! database-level lease keyed the same way.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-account async mutexes.
#[derive(Debug, Default)]
pub struct AccountLockRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AccountLockRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for an account, waiting if another operation for
    /// the same account is in flight.
    pub async fn lock(&self, account_id: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}
