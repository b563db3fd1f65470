// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! iCalendar date-time parsing
//!
//! A trailing `Z` always means UTC, regardless of any `TZID` parameter. A
//! `TZID` names an IANA zone; an unknown zone falls back to UTC. Without
//! either, the value is taken as UTC.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Accepted value forms: compact iCalendar and ISO-8601
const FORMATS: &[&str] = &["%Y%m%dT%H%M%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a `DTSTART`/`DTEND` value; `None` means the event is skipped
pub(crate) fn parse_datetime(value: &str, tzid: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let (value, is_utc) = match value.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (value, false),
    };

    let naive = parse_naive(value)?;

    if is_utc {
        return Some(Utc.from_utc_datetime(&naive));
    }

    match tzid.and_then(|zone| zone.parse::<Tz>().ok()) {
        Some(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc)),
        None => Some(Utc.from_utc_datetime(&naive)),
    }
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

#[cfg(test)]
#[path = "datetime_tests.rs"]
mod tests;
