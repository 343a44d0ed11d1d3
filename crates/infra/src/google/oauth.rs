//! OAuth consent flow for connecting a clinician account to Google
//! Calendar.
//!
//! `begin` builds the consent URL carrying the initiating account id as
//! opaque `state`; the redirect handler recovers it with
//! [`account_id_from_state`] and calls `complete`, which exchanges the
//! authorization code, resolves the primary calendar, and stores the
//! credential.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use clinsync_core::sync::{CalendarApi, CredentialStore};
use clinsync_domain::{CredentialRecord, Result, SyncDirection, SyncError};
use tracing::{info, instrument};
use url::Url;

use super::client::GoogleCalendarClient;

const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const PRIMARY_CALENDAR: &str = "primary";

/// Consent URL plus the state token the redirect must echo back.
#[derive(Debug, Clone)]
pub struct ConsentRequest {
    pub url: String,
    pub state: String,
}

/// OAuth consent flow against Google's authorization endpoint.
pub struct GoogleOAuthFlow {
    client_id: String,
    redirect_uri: String,
    auth_url: String,
}

impl GoogleOAuthFlow {
    /// Create a flow against the production authorization endpoint.
    pub fn new(client_id: String, redirect_uri: String) -> Self {
        Self { client_id, redirect_uri, auth_url: DEFAULT_AUTH_URL.to_string() }
    }

    /// Build the consent URL the clinician's browser is sent to.
    ///
    /// `access_type=offline` plus `prompt=consent` forces Google to issue a
    /// refresh token even on reconnects. The `state` parameter carries the
    /// initiating account id so the redirect handler can route the code.
    pub fn begin(&self, account_id: &str) -> Result<ConsentRequest> {
        let state = URL_SAFE_NO_PAD.encode(account_id);

        let mut url = Url::parse(&self.auth_url)
            .map_err(|e| SyncError::Config(format!("invalid auth url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", CALENDAR_SCOPE)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", &state);

        Ok(ConsentRequest { url: url.into(), state })
    }

    /// Finish the flow after the redirect: exchange the code, resolve the
    /// primary calendar's identity, and persist the credential.
    #[instrument(skip(self, code, client, credentials))]
    pub async fn complete(
        &self,
        account_id: &str,
        code: &str,
        client: &GoogleCalendarClient,
        credentials: &dyn CredentialStore,
    ) -> Result<CredentialRecord> {
        let tokens = client.exchange_code(code, &self.redirect_uri).await?;

        let refresh_token = tokens.refresh_token.ok_or_else(|| {
            SyncError::RemoteRejected(
                "no refresh token in consent response; offline access not granted".into(),
            )
        })?;

        let identity = client.get_calendar(&tokens.access_token, PRIMARY_CALENDAR).await?;

        let record = CredentialRecord {
            account_id: account_id.to_string(),
            access_token: tokens.access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(tokens.expires_in),
            scopes: tokens.scope.unwrap_or_else(|| CALENDAR_SCOPE.to_string()),
            calendar_id: identity.calendar_id,
            calendar_timezone: identity.timezone,
            sync_enabled: true,
            direction: SyncDirection::Bidirectional,
            last_full_sync_at: None,
            sync_cursor: None,
            watch_channel_id: None,
            watch_resource_id: None,
            watch_expires_at: None,
            disconnect_pending: false,
        };

        credentials.upsert(&record).await?;
        info!(account_id, calendar_id = %record.calendar_id, "calendar connected");
        Ok(record)
    }
}

/// Recover the account id the consent flow encoded into `state`.
pub fn account_id_from_state(state: &str) -> Result<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(state)
        .map_err(|_| SyncError::InvalidInput("malformed oauth state".into()))?;
    String::from_utf8(bytes)
        .map_err(|_| SyncError::InvalidInput("malformed oauth state".into()))
}
