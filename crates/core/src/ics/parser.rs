// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VEVENT extraction and lookahead-window filtering

use super::datetime::parse_datetime;
use super::rrule::RecurrenceRule;
use crate::event::{CalendarEvent, EventKind};
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Errors for a payload that is not a calendar at all
///
/// Individual malformed events are skipped silently; only a structurally
/// unusable document is an error.
#[derive(Debug, Error)]
pub enum IcsError {
    #[error("payload is not an iCalendar document")]
    NotACalendar,
}

/// A date-time property value with its optional `TZID` parameter
#[derive(Clone, Debug, Default)]
struct TimeProp {
    value: String,
    tzid: Option<String>,
}

/// Accumulated properties of the VEVENT currently being read
#[derive(Clone, Debug, Default)]
struct VEventProps {
    summary: Option<String>,
    dtstart: Option<TimeProp>,
    dtend: Option<TimeProp>,
    rrule: Option<String>,
}

/// Parse a calendar payload into maintenance events within the lookahead
/// window `(now, now + lookahead)`
pub fn parse_events(
    payload: &str,
    now: DateTime<Utc>,
    lookahead: Duration,
) -> Result<Vec<CalendarEvent>, IcsError> {
    let lines = unfold(payload);

    if !lines
        .iter()
        .any(|line| line.eq_ignore_ascii_case("BEGIN:VCALENDAR"))
    {
        return Err(IcsError::NotACalendar);
    }

    let window_end = now + lookahead;
    let mut events = Vec::new();
    let mut current: Option<VEventProps> = None;

    for line in &lines {
        if line.eq_ignore_ascii_case("BEGIN:VEVENT") {
            current = Some(VEventProps::default());
            continue;
        }
        if line.eq_ignore_ascii_case("END:VEVENT") {
            if let Some(props) = current.take() {
                materialise(props, now, window_end, &mut events);
            }
            continue;
        }

        let Some(props) = current.as_mut() else {
            continue;
        };
        let Some((name, params, value)) = split_content_line(line) else {
            continue;
        };

        match name.to_ascii_uppercase().as_str() {
            "SUMMARY" => props.summary = Some(value.to_string()),
            "DTSTART" => props.dtstart = Some(time_prop(value, &params)),
            "DTEND" => props.dtend = Some(time_prop(value, &params)),
            "RRULE" => props.rrule = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(events)
}

/// Turn one VEVENT's properties into zero or more window events
fn materialise(
    props: VEventProps,
    now: DateTime<Utc>,
    window_end: DateTime<Utc>,
    out: &mut Vec<CalendarEvent>,
) {
    let Some(raw_summary) = props.summary else {
        return;
    };
    let Some(kind) = EventKind::from_summary(&raw_summary) else {
        return;
    };
    let summary = raw_summary.trim().to_lowercase();

    let Some(start_prop) = props.dtstart else {
        return;
    };
    let Some(start) = parse_datetime(&start_prop.value, start_prop.tzid.as_deref()) else {
        return;
    };

    let end = props
        .dtend
        .as_ref()
        .and_then(|prop| parse_datetime(&prop.value, prop.tzid.as_deref()))
        .unwrap_or(start + Duration::hours(1));

    if let Some(rule_str) = props.rrule {
        let Some(rule) = RecurrenceRule::parse(&rule_str) else {
            // Unsupported rule: this event contributes nothing
            return;
        };
        let duration = end - start;
        for occurrence in rule.occurrences(start, window_end + Duration::days(1)) {
            if occurrence > now && occurrence < window_end {
                out.push(CalendarEvent {
                    kind,
                    start: occurrence,
                    end: occurrence + duration,
                    summary: summary.clone(),
                });
            }
        }
    } else if start > now && start < window_end {
        out.push(CalendarEvent {
            kind,
            start,
            end,
            summary,
        });
    }
}

/// Unfold RFC 5545 folded lines, tolerating mixed line endings and trailing
/// whitespace
fn unfold(payload: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for raw in payload.lines() {
        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some(previous) = lines.last_mut() {
                previous.push_str(rest.trim_end());
                continue;
            }
        }
        lines.push(raw.trim_end().to_string());
    }

    lines
}

/// Split `NAME;PARAM=VALUE;...:value` into name, parameters, and value
fn split_content_line(line: &str) -> Option<(&str, Vec<(&str, &str)>, &str)> {
    let (head, value) = line.split_once(':')?;
    let mut parts = head.split(';');
    let name = parts.next()?;

    let params = parts
        .filter_map(|part| part.split_once('='))
        .collect::<Vec<_>>();

    Some((name, params, value))
}

fn time_prop(value: &str, params: &[(&str, &str)]) -> TimeProp {
    let tzid = params
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("TZID"))
        .map(|(_, v)| v.to_string());
    TimeProp {
        value: value.to_string(),
        tzid,
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
