//! Pure appointment-to-external-event translation.
//!
//! Deterministic and free of I/O: translating an unchanged appointment
//! twice yields identical drafts, which is the basis for any future
//! skip-if-unchanged optimization.

use std::str::FromStr;

use chrono_tz::Tz;
use clinsync_domain::constants::{PROVENANCE_FOOTER, REMINDER_OVERRIDES};
use clinsync_domain::{
    Appointment, AppointmentStatus, ExternalEventDraft, ReminderOverride, Result, SyncError,
};

/// Glyph prefixed to the patient name in the event title.
const fn status_glyph(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Confirmed => "\u{2713}",
        _ => "\u{23f3}",
    }
}

/// Map an internal appointment to an outbound event draft.
///
/// - title: confirmation glyph + patient name
/// - description: non-empty optional fields joined by newlines, plus a
///   fixed provenance footer; empty fields silently omitted
/// - times: appointment start/end rendered in the account's calendar
///   timezone
/// - color: fixed status lookup
/// - reminders: two fixed overrides (24h email, 30min popup)
///
/// # Errors
/// Returns `InvalidInput` when the timezone is not a valid IANA name or
/// the appointment's end does not follow its start.
pub fn appointment_to_draft(
    appointment: &Appointment,
    calendar_timezone: &str,
) -> Result<ExternalEventDraft> {
    Tz::from_str(calendar_timezone).map_err(|_| {
        SyncError::InvalidInput(format!("invalid calendar timezone: {calendar_timezone}"))
    })?;

    if appointment.end <= appointment.start {
        return Err(SyncError::InvalidInput(format!(
            "appointment {} ends at or before its start",
            appointment.id
        )));
    }

    let summary =
        format!("{} {}", status_glyph(appointment.status), appointment.patient_name);

    let mut lines: Vec<String> = Vec::new();
    if let Some(reason) = non_empty(appointment.reason.as_deref()) {
        lines.push(reason.to_string());
    }
    if let Some(notes) = non_empty(appointment.internal_notes.as_deref()) {
        lines.push(format!("Notas: {notes}"));
    }
    lines.push(String::new());
    lines.push(PROVENANCE_FOOTER.to_string());
    let description = lines.join("\n");

    let reminders = REMINDER_OVERRIDES
        .iter()
        .map(|(method, minutes)| ReminderOverride { method: (*method).to_string(), minutes: *minutes })
        .collect();

    Ok(ExternalEventDraft {
        summary,
        description,
        start: appointment.start,
        end: appointment.end,
        timezone: calendar_timezone.to_string(),
        color_id: appointment.status.color_id().to_string(),
        location: appointment.location.clone(),
        reminders,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
