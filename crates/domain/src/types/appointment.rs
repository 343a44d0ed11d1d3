//! Appointment types consumed from the scheduling subsystem.
//!
//! The sync engine reads appointments and writes back only the
//! `last_pushed_at` marker; appointment business state is owned elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_EVENT_COLOR;

/// Lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Waiting,
    InConsultation,
    Completed,
    Cancelled,
    NoShow,
    Declined,
}

impl AppointmentStatus {
    /// Provider color id for this status. One entry per status, with a
    /// fixed fallback for anything unmapped.
    #[must_use]
    pub const fn color_id(self) -> &'static str {
        match self {
            Self::Pending => "5",        // yellow
            Self::Confirmed => "10",     // green
            Self::Waiting => "4",        // pink
            Self::InConsultation => "9", // blue
            Self::Completed => "2",      // sage
            Self::Cancelled | Self::Declined => "8", // gray
            Self::NoShow => "11",        // red
        }
    }

    /// Statuses that should exist on the external calendar. Terminal
    /// statuses are removed remotely rather than pushed.
    #[must_use]
    pub const fn is_pushable(self) -> bool {
        !matches!(self, Self::Cancelled | Self::Declined | Self::NoShow)
    }

    /// Stable string form used in storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Waiting => "waiting",
            Self::InConsultation => "in_consultation",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
            Self::Declined => "declined",
        }
    }

    /// Parse the storage form back into a status. Unknown values fall back
    /// to `Pending` with the default color, so old rows keep loading.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "waiting" => Some(Self::Waiting),
            "in_consultation" => Some(Self::InConsultation),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "no_show" => Some(Self::NoShow),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }
}

/// Fallback color for statuses added after this table was written.
#[must_use]
pub fn color_for_status(status: Option<AppointmentStatus>) -> &'static str {
    status.map_or(DEFAULT_EVENT_COLOR, AppointmentStatus::color_id)
}

/// An internal appointment as read from the scheduling subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    /// The clinician account the appointment belongs to.
    pub account_id: String,
    pub patient_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub internal_notes: Option<String>,
    pub location: Option<String>,
    /// Denormalized marker maintained by the sync engine; epoch seconds.
    pub last_pushed_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_has_a_color() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Waiting,
            AppointmentStatus::InConsultation,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
            AppointmentStatus::Declined,
        ] {
            assert!(!status.color_id().is_empty());
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unmapped_status_uses_default_color() {
        assert_eq!(color_for_status(None), DEFAULT_EVENT_COLOR);
    }

    #[test]
    fn terminal_statuses_are_not_pushable() {
        assert!(AppointmentStatus::Confirmed.is_pushable());
        assert!(!AppointmentStatus::Cancelled.is_pushable());
        assert!(!AppointmentStatus::NoShow.is_pushable());
        assert!(!AppointmentStatus::Declined.is_pushable());
    }
}
