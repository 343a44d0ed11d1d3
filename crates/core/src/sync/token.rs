//! Token lifecycle management.
//!
//! Guarantees a valid (non-expired) access token before any remote call,
//! refreshing through the provider when the stored expiry falls within the
//! safety margin and persisting the new token atomically.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument};

use clinsync_domain::constants::TOKEN_REFRESH_MARGIN_SECS;
use clinsync_domain::{CredentialRecord, Result, SyncError};

use super::ports::{CalendarApi, CredentialStore};

/// Everything a component needs to talk to the provider for one account.
#[derive(Debug, Clone)]
pub struct AuthorizedAccount {
    pub account_id: String,
    pub access_token: String,
    pub calendar_id: String,
    pub calendar_timezone: String,
    pub record: CredentialRecord,
}

/// Token manager over the credential store and the provider's token
/// endpoint.
///
/// Not internally locked: callers hold the account lock across
/// `authorized` and the work that follows it, which is what bounds the
/// engine to a single refresh per expiry window.
pub struct TokenManager {
    credentials: Arc<dyn CredentialStore>,
    api: Arc<dyn CalendarApi>,
    refresh_margin_secs: i64,
}

impl TokenManager {
    /// Create a manager with the default five-minute refresh margin.
    #[must_use]
    pub fn new(credentials: Arc<dyn CredentialStore>, api: Arc<dyn CalendarApi>) -> Self {
        Self::with_margin(credentials, api, TOKEN_REFRESH_MARGIN_SECS)
    }

    /// Create a manager with an explicit refresh margin, in seconds.
    #[must_use]
    pub fn with_margin(
        credentials: Arc<dyn CredentialStore>,
        api: Arc<dyn CalendarApi>,
        refresh_margin_secs: i64,
    ) -> Self {
        Self { credentials, api, refresh_margin_secs }
    }

    /// Return a valid authorized context for the account, refreshing the
    /// access token first when it expires within the margin.
    ///
    /// # Errors
    /// - `NotConnected` when no credential exists or a disconnect sweep is
    ///   pending.
    /// - `AuthExpired` when the provider rejects the refresh grant; callers
    ///   must surface "reauthorization required" and never retry silently.
    /// - Transient refresh failures keep their retryable kinds.
    #[instrument(skip(self))]
    pub async fn authorized(&self, account_id: &str) -> Result<AuthorizedAccount> {
        let record = self
            .credentials
            .get(account_id)
            .await?
            .ok_or_else(|| SyncError::NotConnected(format!("no credential for {account_id}")))?;

        if record.disconnect_pending {
            return Err(SyncError::NotConnected(format!(
                "account {account_id} is disconnecting"
            )));
        }

        if !record.expires_within(self.refresh_margin_secs) {
            debug!(account_id, "access token still valid");
            return Ok(Self::context(record));
        }

        info!(account_id, "access token within refresh margin, refreshing");
        let refreshed = self
            .api
            .refresh_access_token(&record.refresh_token)
            .await
            .map_err(|err| match err {
                // A definitive rejection of the grant means consent was
                // revoked; transient kinds stay retryable.
                SyncError::RemoteRejected(msg) | SyncError::AuthExpired(msg) => {
                    SyncError::AuthExpired(msg)
                }
                other => other,
            })?;

        let expires_at = Utc::now() + Duration::seconds(refreshed.expires_in);
        self.credentials
            .update_access_token(account_id, &refreshed.access_token, expires_at)
            .await?;

        let mut record = record;
        record.access_token = refreshed.access_token;
        record.expires_at = expires_at;
        Ok(Self::context(record))
    }

    fn context(record: CredentialRecord) -> AuthorizedAccount {
        AuthorizedAccount {
            account_id: record.account_id.clone(),
            access_token: record.access_token.clone(),
            calendar_id: record.calendar_id.clone(),
            calendar_timezone: record.calendar_timezone.clone(),
            record,
        }
    }
}
