// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RRULE recurrence expansion
//!
//! Covers the rule vocabulary maintenance calendars actually use:
//! `FREQ=DAILY|WEEKLY|MONTHLY`, `INTERVAL`, `COUNT`, `UNTIL`, `BYDAY`
//! (weekday lists for weekly rules, ordinal forms like `1TH` / `-1FR` for
//! monthly rules) and `BYMONTHDAY`. Occurrences keep the fixed UTC
//! time-of-day of `DTSTART`. A rule outside this vocabulary yields no
//! occurrences rather than failing the calendar.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

/// Period-loop safety bound; window bounds terminate generation long before
const MAX_PERIODS: u32 = 4000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Freq {
    Daily,
    Weekly,
    Monthly,
}

/// A `BYDAY` entry: optional ordinal plus weekday (`TH`, `1TH`, `-1FR`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ByDay {
    ordinal: Option<i32>,
    weekday: Weekday,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RecurrenceRule {
    freq: Freq,
    interval: u32,
    count: Option<u32>,
    until: Option<DateTime<Utc>>,
    by_day: Vec<ByDay>,
    by_month_day: Vec<u32>,
}

impl RecurrenceRule {
    /// Parse an RRULE value; `None` means the rule is unsupported
    pub(crate) fn parse(rule: &str) -> Option<Self> {
        let mut freq = None;
        let mut interval = 1u32;
        let mut count = None;
        let mut until = None;
        let mut by_day = Vec::new();
        let mut by_month_day = Vec::new();

        for part in rule.trim().split(';') {
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once('=')?;
            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => {
                    freq = Some(match value.to_ascii_uppercase().as_str() {
                        "DAILY" => Freq::Daily,
                        "WEEKLY" => Freq::Weekly,
                        "MONTHLY" => Freq::Monthly,
                        _ => return None,
                    });
                }
                "INTERVAL" => {
                    interval = value.parse().ok().filter(|i| *i >= 1)?;
                }
                "COUNT" => {
                    count = Some(value.parse().ok()?);
                }
                "UNTIL" => {
                    until = Some(parse_until(value)?);
                }
                "BYDAY" => {
                    for entry in value.split(',') {
                        by_day.push(parse_by_day(entry)?);
                    }
                }
                "BYMONTHDAY" => {
                    for entry in value.split(',') {
                        let day: u32 = entry.parse().ok().filter(|d| (1..=31).contains(d))?;
                        by_month_day.push(day);
                    }
                }
                // WKST and vendor extensions do not change anything we expand
                _ => {}
            }
        }

        Some(Self {
            freq: freq?,
            interval,
            count,
            until,
            by_day,
            by_month_day,
        })
    }

    /// Expand occurrences from `dtstart` until `bound` (exclusive)
    ///
    /// Occurrences are chronological; `COUNT` counts from `dtstart` onward
    /// and `UNTIL` is inclusive.
    pub(crate) fn occurrences(
        &self,
        dtstart: DateTime<Utc>,
        bound: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        let mut seen = 0u32;
        let time = dtstart.time();

        match self.freq {
            Freq::Daily => {
                for period in 0..MAX_PERIODS {
                    let candidate =
                        dtstart + Duration::days(i64::from(period) * i64::from(self.interval));
                    if !self.admit(candidate, bound, &mut seen, &mut out) {
                        break;
                    }
                }
            }

            Freq::Weekly => {
                let weekdays: Vec<Weekday> = if self.by_day.is_empty() {
                    vec![dtstart.weekday()]
                } else {
                    self.by_day.iter().map(|d| d.weekday).collect()
                };
                let anchor = dtstart.date_naive()
                    - Duration::days(i64::from(dtstart.weekday().num_days_from_monday()));

                'weeks: for period in 0..MAX_PERIODS {
                    let week_start =
                        anchor + Duration::days(7 * i64::from(period) * i64::from(self.interval));
                    let mut dates: Vec<NaiveDate> = weekdays
                        .iter()
                        .map(|wd| {
                            week_start + Duration::days(i64::from(wd.num_days_from_monday()))
                        })
                        .collect();
                    dates.sort();
                    for date in dates {
                        let candidate = at_time(date, time);
                        if candidate < dtstart {
                            continue;
                        }
                        if !self.admit(candidate, bound, &mut seen, &mut out) {
                            break 'weeks;
                        }
                    }
                }
            }

            Freq::Monthly => {
                'months: for period in 0..MAX_PERIODS {
                    let (year, month) =
                        add_months(dtstart.year(), dtstart.month(), period * self.interval);
                    let mut dates: Vec<NaiveDate> = Vec::new();

                    if !self.by_month_day.is_empty() {
                        for &day in &self.by_month_day {
                            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                                dates.push(date);
                            }
                        }
                    } else if !self.by_day.is_empty() {
                        for by_day in &self.by_day {
                            let ordinal = by_day.ordinal.unwrap_or(1);
                            if let Some(date) =
                                nth_weekday_of_month(year, month, by_day.weekday, ordinal)
                            {
                                dates.push(date);
                            }
                        }
                    } else if let Some(date) = NaiveDate::from_ymd_opt(year, month, dtstart.day())
                    {
                        // Months lacking the start's day-of-month are skipped
                        dates.push(date);
                    }

                    dates.sort();
                    for date in dates {
                        let candidate = at_time(date, time);
                        if candidate < dtstart {
                            continue;
                        }
                        if !self.admit(candidate, bound, &mut seen, &mut out) {
                            break 'months;
                        }
                    }
                }
            }
        }

        out
    }

    /// Apply UNTIL/COUNT/bound to a chronological candidate; false stops
    /// generation
    fn admit(
        &self,
        candidate: DateTime<Utc>,
        bound: DateTime<Utc>,
        seen: &mut u32,
        out: &mut Vec<DateTime<Utc>>,
    ) -> bool {
        if let Some(until) = self.until {
            if candidate > until {
                return false;
            }
        }
        *seen += 1;
        if let Some(count) = self.count {
            if *seen > count {
                return false;
            }
        }
        if candidate >= bound {
            return false;
        }
        out.push(candidate);
        true
    }
}

fn at_time(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(time))
}

fn parse_until(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    for format in ["%Y%m%dT%H%M%SZ", "%Y%m%dT%H%M%S"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    // Date-only UNTIL: midnight of that day
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .ok()
        .map(|date| at_time(date, NaiveTime::MIN))
}

fn parse_by_day(entry: &str) -> Option<ByDay> {
    let entry = entry.trim();
    let split = entry.find(|c: char| c.is_ascii_alphabetic())?;
    let (ordinal_part, code) = entry.split_at(split);

    let ordinal = if ordinal_part.is_empty() {
        None
    } else {
        Some(ordinal_part.parse::<i32>().ok().filter(|o| *o != 0)?)
    };

    let weekday = match code.to_ascii_uppercase().as_str() {
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        "SU" => Weekday::Sun,
        _ => return None,
    };

    Some(ByDay { ordinal, weekday })
}

fn add_months(year: i32, month: u32, delta: u32) -> (i32, u32) {
    let zero_based = year * 12 + (month as i32 - 1) + delta as i32;
    (zero_based.div_euclid(12), (zero_based.rem_euclid(12) + 1) as u32)
}

/// Nth weekday of a month; negative ordinals count from the end
fn nth_weekday_of_month(
    year: i32,
    month: u32,
    weekday: Weekday,
    ordinal: i32,
) -> Option<NaiveDate> {
    if ordinal > 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let offset = (7 + i64::from(weekday.num_days_from_monday())
            - i64::from(first.weekday().num_days_from_monday()))
            % 7;
        let date = first + Duration::days(offset + 7 * (i64::from(ordinal) - 1));
        (date.month() == month && date.year() == year).then_some(date)
    } else if ordinal < 0 {
        let (next_year, next_month) = add_months(year, month, 1);
        let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)? - Duration::days(1);
        let offset = (7 + i64::from(last.weekday().num_days_from_monday())
            - i64::from(weekday.num_days_from_monday()))
            % 7;
        let date = last - Duration::days(offset + 7 * (i64::from(-ordinal) - 1));
        (date.month() == month && date.year() == year).then_some(date)
    } else {
        None
    }
}

#[cfg(test)]
#[path = "rrule_tests.rs"]
mod tests;
