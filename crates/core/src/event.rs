// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Calendar event model and pure timeline logic
//!
//! Conflict resolution and timeline diffing are pure functions over value
//! types; the poller and scheduler drive them but hold no logic of their own
//! for these rules.

use crate::config::Server;
use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The kind of maintenance event a calendar entry requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Restart,
    Wipe,
}

impl EventKind {
    /// Parse a calendar summary into an event kind
    ///
    /// Matching is strict after trim + lowercase: `"Restart "` matches,
    /// `"[restart]"` does not.
    pub fn from_summary(summary: &str) -> Option<Self> {
        match summary.trim().to_lowercase().as_str() {
            "restart" => Some(Self::Restart),
            "wipe" => Some(Self::Wipe),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Restart => write!(f, "restart"),
            EventKind::Wipe => write!(f, "wipe"),
        }
    }
}

/// A materialised calendar occurrence
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarEvent {
    pub kind: EventKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
}

/// An event bound to a server, ready for scheduling
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub server: Server,
    pub event: CalendarEvent,
    pub scheduled: DateTime<Utc>,
}

impl ScheduledEvent {
    pub fn new(server: Server, event: CalendarEvent) -> Self {
        let scheduled = event.start;
        Self {
            server,
            event,
            scheduled,
        }
    }

    /// Bucket key: scheduled time truncated to the minute, rendered RFC3339
    pub fn minute_key(&self) -> String {
        minute_key(self.scheduled)
    }

    /// Identity key for timeline diffing
    pub fn diff_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.server.path.display(),
            self.event.kind,
            self.scheduled.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// Truncate a time to the whole minute
pub fn truncate_to_minute(time: DateTime<Utc>) -> DateTime<Utc> {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Canonical rendering of a minute-truncated time
pub fn minute_key(time: DateTime<Utc>) -> String {
    truncate_to_minute(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Resolve same-server/same-minute conflicts
///
/// Within a `(server path, minute)` group a wipe beats any number of
/// restarts; a group of restarts collapses to a single one. Output order is
/// unspecified; callers sort.
pub fn resolve_conflicts(events: Vec<ScheduledEvent>) -> Vec<ScheduledEvent> {
    let mut groups: HashMap<(String, String), Vec<ScheduledEvent>> = HashMap::new();

    for event in events {
        let key = (
            event.server.path.display().to_string(),
            event.minute_key(),
        );
        groups.entry(key).or_default().push(event);
    }

    let mut resolved = Vec::with_capacity(groups.len());
    for (_, mut group) in groups {
        if group.len() == 1 {
            resolved.extend(group);
            continue;
        }

        if let Some(pos) = group.iter().position(|e| e.event.kind == EventKind::Wipe) {
            let wipe = group.swap_remove(pos);
            tracing::info!(
                server = %wipe.server.name,
                at = %wipe.minute_key(),
                "conflict resolved: wipe takes precedence"
            );
            resolved.push(wipe);
        } else {
            // All restarts: keep one
            resolved.push(group.remove(0));
        }
    }

    resolved
}

/// The difference between two timeline snapshots
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimelineDiff {
    pub added: Vec<ScheduledEvent>,
    pub removed: Vec<ScheduledEvent>,
}

impl TimelineDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Diff two timelines on `path|kind|time` identity
pub fn diff_timelines(old: &[ScheduledEvent], new: &[ScheduledEvent]) -> TimelineDiff {
    let old_keys: HashMap<String, &ScheduledEvent> =
        old.iter().map(|e| (e.diff_key(), e)).collect();
    let new_keys: HashMap<String, &ScheduledEvent> =
        new.iter().map(|e| (e.diff_key(), e)).collect();

    let mut added: Vec<ScheduledEvent> = new
        .iter()
        .filter(|e| !old_keys.contains_key(&e.diff_key()))
        .cloned()
        .collect();
    let mut removed: Vec<ScheduledEvent> = old
        .iter()
        .filter(|e| !new_keys.contains_key(&e.diff_key()))
        .cloned()
        .collect();

    added.sort_by_key(|e| e.scheduled);
    removed.sort_by_key(|e| e.scheduled);

    TimelineDiff { added, removed }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
