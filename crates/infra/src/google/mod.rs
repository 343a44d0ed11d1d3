//! Google Calendar provider integration: HTTP client, OAuth consent flow,
//! and wire types.

pub mod client;
pub mod oauth;
pub mod types;

pub use client::GoogleCalendarClient;
pub use oauth::{account_id_from_state, ConsentRequest, GoogleOAuthFlow};
