//! Attendance status rules.
//!
//! Two pure rules live here: the time-of-day classification applied once
//! at check-in, and the calendar rule that assigns an effective status to
//! days without any attendance record.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Check-in time-of-day cutoff separating `present` from `late` (08:00).
pub fn default_late_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).expect("valid cutoff")
}

/// The weekday with no expected attendance.
pub const DEFAULT_OFF_DAY: Weekday = Weekday::Sun;

/// Status of one attendance day.
///
/// `Present` and `Late` are assigned by the engine at check-in;
/// `Sick` and `Permission` are entered administratively; `Absent` is
/// mostly derived (see [`effective_status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Sick,
    Permission,
}

impl AttendanceStatus {
    /// Stable string code as stored in the attendance table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Late => "late",
            Self::Absent => "absent",
            Self::Sick => "sick",
            Self::Permission => "permission",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "present" => Some(Self::Present),
            "late" => Some(Self::Late),
            "absent" => Some(Self::Absent),
            "sick" => Some(Self::Sick),
            "permission" => Some(Self::Permission),
            _ => None,
        }
    }

    /// Single-letter code used in the monthly recap grid
    /// (H = hadir, T = terlambat, A = alpha, S = sakit, I = izin).
    pub fn letter(self) -> char {
        match self {
            Self::Present => 'H',
            Self::Late => 'T',
            Self::Absent => 'A',
            Self::Sick => 'S',
            Self::Permission => 'I',
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a check-in by wall-clock time of day.
///
/// At or before the cutoff is `Present`; strictly after is `Late`.
/// Decided once at check-in and never recomputed.
pub fn status_for_check_in(time_of_day: NaiveTime, cutoff: NaiveTime) -> AttendanceStatus {
    if time_of_day <= cutoff {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Late
    }
}

/// Effective status of one calendar day for reporting.
///
/// A recorded status always wins. Without a record: future days and the
/// off weekday are blank (`None`); any other past or present day defaults
/// to `Absent`. Silence is treated as absence on working days.
pub fn effective_status(
    recorded: Option<AttendanceStatus>,
    date: NaiveDate,
    today: NaiveDate,
    off_day: Weekday,
) -> Option<AttendanceStatus> {
    if let Some(status) = recorded {
        return Some(status);
    }
    if date > today {
        return None;
    }
    if date.weekday() == off_day {
        return None;
    }
    Some(AttendanceStatus::Absent)
}
