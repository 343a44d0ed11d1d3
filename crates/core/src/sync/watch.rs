//! Watch channel registration and webhook notification handling.
//!
//! Provider channels are time-bounded; this module registers them, renews
//! them before expiry, and turns incoming notifications into idempotent
//! pulls. Duplicate or stale notifications are tolerated by design.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use clinsync_domain::constants::{
    DEFAULT_PULL_WINDOW_DAYS, WATCH_CHANNEL_TTL_SECS, WATCH_RENEWAL_MARGIN_SECS,
};
use clinsync_domain::{PullOutcome, Result, SyncError, TimeWindow};

use super::inbound::InboundImporter;
use super::locks::AccountLockRegistry;
use super::ports::{CalendarApi, CredentialStore};
use super::token::TokenManager;

/// Resource states delivered by the provider. The initial `sync` message
/// only acknowledges channel creation.
const RESOURCE_STATE_SYNC: &str = "sync";

/// Manages push-notification channels for connected accounts.
pub struct WatchChannelManager {
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<TokenManager>,
    api: Arc<dyn CalendarApi>,
    importer: Arc<InboundImporter>,
    locks: Arc<AccountLockRegistry>,
    /// Public HTTPS endpoint the provider posts notifications to.
    callback_url: String,
}

impl WatchChannelManager {
    /// Wire up a manager over the shared stores.
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<TokenManager>,
        api: Arc<dyn CalendarApi>,
        importer: Arc<InboundImporter>,
        locks: Arc<AccountLockRegistry>,
        callback_url: String,
    ) -> Self {
        Self { credentials, tokens, api, importer, locks, callback_url }
    }

    /// Ensure the account has a live watch channel, registering or renewing
    /// one when missing or expiring within the renewal margin. Returns the
    /// active channel id.
    #[instrument(skip(self))]
    pub async fn ensure_channel(&self, account_id: &str) -> Result<String> {
        let _guard = self.locks.lock(account_id).await;

        let record = self
            .credentials
            .get(account_id)
            .await?
            .ok_or_else(|| SyncError::NotConnected(format!("no credential for {account_id}")))?;

        if !record.watch_needs_renewal(WATCH_RENEWAL_MARGIN_SECS) {
            if let Some(channel_id) = &record.watch_channel_id {
                debug!(account_id, %channel_id, "watch channel still live");
                return Ok(channel_id.clone());
            }
        }

        let auth = self.tokens.authorized(account_id).await?;

        // Stop the expiring channel first so the provider does not keep
        // delivering to two channels.
        if let (Some(old_id), Some(old_resource)) =
            (&record.watch_channel_id, &record.watch_resource_id)
        {
            if let Err(err) =
                self.api.stop_channel(&auth.access_token, old_id, old_resource).await
            {
                warn!(account_id, error = %err, "failed to stop expiring watch channel");
            }
        }

        let channel_id = Uuid::now_v7().to_string();
        let channel = self
            .api
            .watch_calendar(
                &auth.access_token,
                &auth.calendar_id,
                &channel_id,
                &self.callback_url,
                WATCH_CHANNEL_TTL_SECS,
            )
            .await?;

        self.credentials.update_watch_channel(account_id, Some(&channel)).await?;
        info!(account_id, channel_id = %channel.channel_id, expires_at = %channel.expires_at, "watch channel registered");
        Ok(channel.channel_id)
    }

    /// Handle a provider push notification.
    ///
    /// Responds to at-least-once delivery: unknown or stale channels are
    /// acknowledged without work, and the pull itself is idempotent.
    #[instrument(skip(self))]
    pub async fn handle_notification(
        &self,
        channel_id: &str,
        resource_id: &str,
        resource_state: &str,
    ) -> Result<Option<PullOutcome>> {
        if resource_state == RESOURCE_STATE_SYNC {
            debug!(channel_id, "channel creation acknowledgement");
            return Ok(None);
        }

        let Some(record) = self.credentials.find_by_watch_channel(channel_id).await? else {
            warn!(channel_id, "notification for unknown channel, ignoring");
            return Ok(None);
        };

        if record.watch_resource_id.as_deref() != Some(resource_id) {
            warn!(channel_id, resource_id, "resource id mismatch, ignoring stale notification");
            return Ok(None);
        }

        let window = TimeWindow::next_days(DEFAULT_PULL_WINDOW_DAYS);
        let outcome = self.importer.pull(&record.account_id, window).await?;
        Ok(Some(outcome))
    }
}
