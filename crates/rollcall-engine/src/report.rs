//! Calendar-range status derivation and recap tallies.
//!
//! Walks a date range day by day, overlaying stored attendance records
//! on the calendar rules of `rollcall_core::status`. Days outside any
//! record come back blank or absent per those rules; nothing here
//! writes to the store.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;
use uuid::Uuid;

use rollcall_core::{
    status::{effective_status, AttendanceStatus},
    store::AttendanceStore,
    types::AttendanceRecord,
};

use crate::error::EngineError;

/// One calendar day in a status report.
#[derive(Debug, Clone, Serialize)]
pub struct DayStatus {
    pub date: NaiveDate,
    /// Effective status; `None` renders blank (future day or off day).
    pub status: Option<AttendanceStatus>,
    /// The underlying record, when one exists.
    pub recorded: Option<AttendanceRecord>,
}

impl DayStatus {
    /// Single-character cell for the recap grid; blank days render `-`.
    pub fn cell(&self) -> char {
        self.status.map(AttendanceStatus::letter).unwrap_or('-')
    }
}

/// Per-status counts over a reported range. Blank days are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecapTally {
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub sick: usize,
    pub permission: usize,
}

/// Effective status for every day in `[from, to]` for one identity.
///
/// `today` anchors the future-day rule so reports are reproducible in
/// tests; callers normally pass the current local date.
pub async fn range_statuses<S: AttendanceStore>(
    store: &S,
    identity_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
    off_day: Weekday,
) -> Result<Vec<DayStatus>, EngineError> {
    if from > to {
        return Ok(Vec::new());
    }

    let records = store
        .list_range(identity_id, from, to)
        .await
        .map_err(EngineError::store)?;

    // list_range is day-ascending; the first record of a day wins and
    // any further rows for it are skipped.
    let mut records = records.into_iter().peekable();
    let mut days = Vec::new();
    let mut date = from;
    loop {
        let recorded = loop {
            match records.peek() {
                Some(r) if r.day < date => {
                    records.next();
                }
                Some(r) if r.day == date => break records.next(),
                _ => break None,
            }
        };
        let status = effective_status(
            recorded.as_ref().map(|r| r.status),
            date,
            today,
            off_day,
        );
        days.push(DayStatus {
            date,
            status,
            recorded,
        });

        if date == to {
            break;
        }
        date = date
            .checked_add_days(Days::new(1))
            .ok_or_else(|| EngineError::InvalidDate(format!("day after {date}")))?;
    }

    tracing::debug!(%identity_id, %from, %to, days = days.len(), "derived range statuses");
    Ok(days)
}

/// Statuses for one whole calendar month.
pub async fn month_statuses<S: AttendanceStore>(
    store: &S,
    identity_id: Uuid,
    year: i32,
    month: u32,
    today: NaiveDate,
    off_day: Weekday,
) -> Result<Vec<DayStatus>, EngineError> {
    let from = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::InvalidDate(format!("{year}-{month:02}")))?;
    let to = last_day_of_month(from);
    range_statuses(store, identity_id, from, to, today, off_day).await
}

/// Count effective statuses over a derived range.
pub fn tally(days: &[DayStatus]) -> RecapTally {
    let mut t = RecapTally::default();
    for day in days {
        match day.status {
            Some(AttendanceStatus::Present) => t.present += 1,
            Some(AttendanceStatus::Late) => t.late += 1,
            Some(AttendanceStatus::Absent) => t.absent += 1,
            Some(AttendanceStatus::Sick) => t.sick += 1,
            Some(AttendanceStatus::Permission) => t.permission += 1,
            None => {}
        }
    }
    t
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (next_y, next_m) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(next_y, next_m, 1)
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .unwrap_or(first)
}
