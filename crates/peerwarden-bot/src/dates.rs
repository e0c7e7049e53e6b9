// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of moderator-entered expiry dates (`DD-MM-YYYY HH:MM`).

use chrono::{DateTime, Local, LocalResult, NaiveDate, TimeZone, Utc};
use peerwarden_core::PeerwardenError;

fn invalid(msg: &str) -> PeerwardenError {
    PeerwardenError::Validation(msg.to_string())
}

fn field(raw: &str, min: u32, max: u32, msg: &str) -> Result<u32, PeerwardenError> {
    raw.parse::<u32>()
        .ok()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| invalid(msg))
}

/// Parse `DD-MM-YYYY HH:MM` as a wall-clock time in the server's zone.
pub fn parse_local_datetime(text: &str) -> Result<DateTime<Utc>, PeerwardenError> {
    parse_datetime_in(text, &Local)
}

/// Parse `DD-MM-YYYY HH:MM` as a wall-clock time in `tz`.
///
/// Each field is range-checked separately so the error names the culprit.
/// Dates that do not exist on the calendar, and wall-clock times skipped
/// or repeated by a DST change, are rejected as well.
pub fn parse_datetime_in<Tz: TimeZone>(
    text: &str,
    tz: &Tz,
) -> Result<DateTime<Utc>, PeerwardenError> {
    let mut parts = text.split_whitespace();
    let (Some(date), Some(time), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid("invalid format: expected 'DD-MM-YYYY HH:MM'"));
    };

    let date: Vec<&str> = date.split('-').collect();
    let [day, month, year] = date.as_slice() else {
        return Err(invalid("invalid date format: expected DD-MM-YYYY"));
    };
    let time: Vec<&str> = time.split(':').collect();
    let [hour, minute] = time.as_slice() else {
        return Err(invalid("invalid time format: expected HH:MM"));
    };

    let day = field(day, 1, 31, "invalid day: must be 1-31")?;
    let month = field(month, 1, 12, "invalid month: must be 1-12")?;
    let year = field(year, 2000, 2100, "invalid year: must be 2000-2100")?;
    let hour = field(hour, 0, 23, "invalid hour: must be 0-23")?;
    let minute = field(minute, 0, 59, "invalid minute: must be 0-59")?;

    let naive = NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .ok_or_else(|| invalid("invalid date: no such day in that month"))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(_, _) | LocalResult::None => {
            Err(invalid("invalid time: ambiguous or skipped by a clock change"))
        }
    }
}
