// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use std::path::PathBuf;
use wd_adapters::notify::NotifyLevel;
use wd_adapters::{FakeCalendarFetcher, FakeNotifyAdapter};
use wd_core::FakeClock;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 16, 18, 0, 0).unwrap()
}

fn server(name: &str) -> Server {
    Server {
        name: name.to_string(),
        path: PathBuf::from(format!("/srv/fleet/{}", name)),
        calendar_url: format!("https://calendar.example/{}.ics", name),
        branch: String::new(),
        wipe_blueprints: false,
        generate_map: false,
    }
}

fn calendar(events: &[(&str, &str)]) -> String {
    let mut out = String::from("BEGIN:VCALENDAR\r\n");
    for (summary, dtstart) in events {
        out.push_str("BEGIN:VEVENT\r\n");
        out.push_str(&format!("SUMMARY:{}\r\n", summary));
        out.push_str(&format!("DTSTART:{}\r\n", dtstart));
        out.push_str("END:VEVENT\r\n");
    }
    out.push_str("END:VCALENDAR\r\n");
    out
}

struct Fixture {
    poller: CalendarPoller<FakeCalendarFetcher, FakeNotifyAdapter, FakeClock>,
    fetcher: FakeCalendarFetcher,
    notify: FakeNotifyAdapter,
}

fn fixture() -> Fixture {
    let fetcher = FakeCalendarFetcher::new();
    let notify = FakeNotifyAdapter::new();
    let poller = CalendarPoller::new(fetcher.clone(), notify.clone(), FakeClock::at(now()), 24);
    Fixture {
        poller,
        fetcher,
        notify,
    }
}

#[tokio::test]
async fn refresh_materialises_events_sorted_by_time() {
    let f = fixture();
    let a = server("us-weekly");
    let b = server("us-long");
    f.fetcher
        .serve(&a.calendar_url, calendar(&[("restart", "20251116T200000Z")]));
    f.fetcher
        .serve(&b.calendar_url, calendar(&[("wipe", "20251116T190000Z")]));

    let timeline = f.poller.refresh(&[a, b]).await;

    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].server.name, "us-long");
    assert_eq!(timeline[0].event.kind, EventKind::Wipe);
    assert_eq!(timeline[1].server.name, "us-weekly");
}

#[tokio::test]
async fn failed_fetch_skips_that_server_only() {
    let f = fixture();
    let healthy = server("us-weekly");
    let broken = server("us-long");
    f.fetcher.serve(
        &healthy.calendar_url,
        calendar(&[("restart", "20251116T200000Z")]),
    );
    // broken.calendar_url is never served

    let timeline = f.poller.refresh(&[healthy, broken]).await;

    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].server.name, "us-weekly");
}

#[tokio::test]
async fn non_calendar_payload_skips_that_server() {
    let f = fixture();
    let broken = server("us-long");
    f.fetcher.serve(&broken.calendar_url, "<html>oops</html>");

    let timeline = f.poller.refresh(&[broken]).await;
    assert!(timeline.is_empty());
}

#[tokio::test]
async fn same_minute_wipe_wins_over_restart() {
    let f = fixture();
    let a = server("us-weekly");
    f.fetcher.serve(
        &a.calendar_url,
        calendar(&[
            ("restart", "20251116T183000Z"),
            ("wipe", "20251116T183000Z"),
        ]),
    );

    let timeline = f.poller.refresh(&[a]).await;

    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].event.kind, EventKind::Wipe);
}

#[tokio::test]
async fn first_refresh_announces_added_events() {
    let f = fixture();
    let a = server("us-weekly");
    f.fetcher.serve(
        &a.calendar_url,
        calendar(&[
            ("restart", "20251116T190000Z"),
            ("wipe", "20251117T170000Z"),
        ]),
    );

    f.poller.refresh(std::slice::from_ref(&a)).await;

    let added = f.notify.at_level(NotifyLevel::Success);
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].title, "Calendar Events Added");
    assert!(added[0].description.contains("**2** new event(s)"));
    assert!(added[0].description.contains("**Restarts:**"));
    assert!(added[0].description.contains("**Wipes:**"));
}

#[tokio::test]
async fn repeated_refresh_with_same_feed_is_silent() {
    let f = fixture();
    let a = server("us-weekly");
    f.fetcher
        .serve(&a.calendar_url, calendar(&[("restart", "20251116T190000Z")]));

    let first = f.poller.refresh(std::slice::from_ref(&a)).await;
    f.notify.clear();
    let second = f.poller.refresh(std::slice::from_ref(&a)).await;

    assert_eq!(first, second);
    assert!(f.notify.sent().is_empty());
}

#[tokio::test]
async fn dropped_events_announce_removal() {
    let f = fixture();
    let a = server("us-weekly");
    f.fetcher
        .serve(&a.calendar_url, calendar(&[("wipe", "20251116T190000Z")]));
    f.poller.refresh(std::slice::from_ref(&a)).await;

    f.fetcher.serve(&a.calendar_url, calendar(&[]));
    f.notify.clear();
    let timeline = f.poller.refresh(std::slice::from_ref(&a)).await;

    assert!(timeline.is_empty());
    let removed = f.notify.at_level(NotifyLevel::Warning);
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].title, "Calendar Events Removed");
    assert!(removed[0].description.contains("us-weekly"));
}

#[tokio::test]
async fn fetch_failure_drops_contribution_and_announces_removal() {
    let f = fixture();
    let a = server("us-weekly");
    f.fetcher
        .serve(&a.calendar_url, calendar(&[("wipe", "20251116T190000Z")]));
    f.poller.refresh(std::slice::from_ref(&a)).await;

    f.fetcher.remove(&a.calendar_url);
    f.notify.clear();
    let timeline = f.poller.refresh(std::slice::from_ref(&a)).await;

    assert!(timeline.is_empty());
    assert_eq!(f.notify.at_level(NotifyLevel::Warning).len(), 1);
}

#[test]
fn describe_events_groups_by_kind() {
    let at = now();
    let make = |name: &str, kind| {
        ScheduledEvent::new(
            server(name),
            wd_core::CalendarEvent {
                kind,
                start: at,
                end: at + Duration::hours(1),
                summary: String::new(),
            },
        )
    };

    let text = describe_events(&[
        make("us-weekly", EventKind::Restart),
        make("us-build", EventKind::Wipe),
    ]);

    assert_eq!(
        text,
        "**Restarts:**\n• us-weekly at Sun Nov 16 18:00 UTC\n\n**Wipes:**\n• us-build at Sun Nov 16 18:00 UTC"
    );
}
