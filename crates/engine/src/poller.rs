// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Calendar poller and event materialiser
//!
//! Each refresh fetches every server's calendar, expands it inside the
//! lookahead window, resolves same-minute conflicts, and reports what
//! changed against the previous snapshot. A server whose fetch or parse
//! fails simply contributes nothing this round.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;
use tokio::task::JoinSet;
use wd_adapters::calendar::CalendarFetcher;
use wd_adapters::notify::{Notification, NotifyAdapter};
use wd_core::{
    diff_timelines, parse_events, resolve_conflicts, Clock, EventKind, ScheduledEvent, Server,
    TimelineDiff,
};

/// Materialises calendar feeds into a conflict-free timeline
pub struct CalendarPoller<F, N, C> {
    fetcher: F,
    notify: N,
    clock: C,
    lookahead: Duration,
    previous: Mutex<Vec<ScheduledEvent>>,
}

impl<F, N, C> CalendarPoller<F, N, C>
where
    F: CalendarFetcher,
    N: NotifyAdapter,
    C: Clock,
{
    pub fn new(fetcher: F, notify: N, clock: C, lookahead_hours: u32) -> Self {
        Self {
            fetcher,
            notify,
            clock,
            lookahead: Duration::hours(i64::from(lookahead_hours)),
            previous: Mutex::new(Vec::new()),
        }
    }

    /// Fetch and materialise all calendars; returns the new timeline
    pub async fn refresh(&self, servers: &[Server]) -> Vec<ScheduledEvent> {
        tracing::info!(servers = servers.len(), "updating calendar events");
        let now = self.clock.now_utc();

        let mut fetches = JoinSet::new();
        for server in servers.iter().cloned() {
            let fetcher = self.fetcher.clone();
            fetches.spawn(async move {
                let payload = fetcher.fetch(&server.calendar_url).await;
                (server, payload)
            });
        }

        let mut candidates = Vec::new();
        while let Some(joined) = fetches.join_next().await {
            let Ok((server, fetched)) = joined else {
                continue;
            };
            let payload = match fetched {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(server = %server.name, error = %e, "calendar fetch failed, skipping server");
                    continue;
                }
            };
            match parse_events(&payload, now, self.lookahead) {
                Ok(events) => {
                    tracing::info!(server = %server.name, events = events.len(), "found upcoming event(s)");
                    candidates.extend(
                        events
                            .into_iter()
                            .map(|event| ScheduledEvent::new(server.clone(), event)),
                    );
                }
                Err(e) => {
                    tracing::warn!(server = %server.name, error = %e, "calendar parse failed, skipping server");
                }
            }
        }

        let mut timeline = resolve_conflicts(candidates);
        timeline.sort_by(|a, b| {
            a.scheduled
                .cmp(&b.scheduled)
                .then_with(|| a.server.path.cmp(&b.server.path))
        });

        let diff = {
            let mut previous = self.previous.lock().unwrap_or_else(|e| e.into_inner());
            let diff = diff_timelines(&previous, &timeline);
            *previous = timeline.clone();
            diff
        };
        self.announce(&diff).await;
        log_upcoming(&timeline, now);

        timeline
    }

    async fn announce(&self, diff: &TimelineDiff) {
        if !diff.added.is_empty() {
            tracing::info!(events = diff.added.len(), "calendar events added");
            self.notify
                .emit(Notification::success(
                    "Calendar Events Added",
                    format!(
                        "**{}** new event(s) scheduled:\n\n{}",
                        diff.added.len(),
                        describe_events(&diff.added)
                    ),
                ))
                .await;
        }
        if !diff.removed.is_empty() {
            tracing::info!(events = diff.removed.len(), "calendar events removed");
            self.notify
                .emit(Notification::warning(
                    "Calendar Events Removed",
                    format!(
                        "**{}** event(s) removed:\n\n{}",
                        diff.removed.len(),
                        describe_events(&diff.removed)
                    ),
                ))
                .await;
        }
    }
}

fn log_upcoming(timeline: &[ScheduledEvent], now: DateTime<Utc>) {
    if timeline.is_empty() {
        tracing::info!("no upcoming events");
        return;
    }

    tracing::info!("upcoming events:");
    for event in timeline {
        let minutes_until = (event.scheduled - now).num_minutes();
        tracing::info!(
            "  {} - {} [{}] (in {}m)",
            event.scheduled.format("%a %b %d %H:%M UTC"),
            event.server.name,
            event.event.kind,
            minutes_until
        );
    }
}

/// Grouped restart/wipe listing used in change notifications
pub fn describe_events(events: &[ScheduledEvent]) -> String {
    let mut restarts = Vec::new();
    let mut wipes = Vec::new();

    for event in events {
        let line = format!(
            "• {} at {}",
            event.server.name,
            event.scheduled.format("%a %b %d %H:%M UTC")
        );
        match event.event.kind {
            EventKind::Restart => restarts.push(line),
            EventKind::Wipe => wipes.push(line),
        }
    }

    let mut out = String::new();
    if !restarts.is_empty() {
        out.push_str("**Restarts:**\n");
        out.push_str(&restarts.join("\n"));
        if !wipes.is_empty() {
            out.push_str("\n\n");
        }
    }
    if !wipes.is_empty() {
        out.push_str("**Wipes:**\n");
        out.push_str(&wipes.join("\n"));
    }

    out
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
