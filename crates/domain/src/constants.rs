//! Fixed values shared across the sync engine.

/// Refresh the access token when it expires within this many seconds.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Bounded timeout applied to every remote provider call, in seconds.
pub const REMOTE_CALL_TIMEOUT_SECS: u64 = 30;

/// Renew a watch channel when it expires within this many seconds.
pub const WATCH_RENEWAL_MARGIN_SECS: i64 = 3600;

/// Time-to-live requested for newly registered watch channels, in seconds
/// (providers cap this; seven days matches the Google Calendar maximum).
pub const WATCH_CHANNEL_TTL_SECS: i64 = 7 * 24 * 3600;

/// Default inbound pull window, in days ahead of now.
pub const DEFAULT_PULL_WINDOW_DAYS: i64 = 90;

/// Fixed reminder overrides attached to every pushed event:
/// (method, minutes before start). Not configurable per appointment.
pub const REMINDER_OVERRIDES: [(&str, i64); 2] = [("email", 24 * 60), ("popup", 30)];

/// Provenance footer appended to every pushed event description.
pub const PROVENANCE_FOOTER: &str = "---\nGestionado por ClinSync";

/// Color id used for statuses missing from the lookup table (lavender).
pub const DEFAULT_EVENT_COLOR: &str = "1";

/// Title placeholder for imported events the provider returned untitled.
pub const UNTITLED_EVENT: &str = "(Sin t\u{ed}tulo)";
