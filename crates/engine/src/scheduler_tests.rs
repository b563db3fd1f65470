// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use wd_core::{CalendarEvent, EventKind, FakeClock, Server};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 16, 18, 0, 0).unwrap()
}

fn server(name: &str) -> Server {
    Server {
        name: name.to_string(),
        path: PathBuf::from(format!("/srv/fleet/{}", name)),
        calendar_url: String::new(),
        branch: String::new(),
        wipe_blueprints: false,
        generate_map: false,
    }
}

fn event(name: &str, kind: EventKind, at: DateTime<Utc>) -> ScheduledEvent {
    ScheduledEvent::new(
        server(name),
        CalendarEvent {
            kind,
            start: at,
            end: at + chrono::Duration::hours(1),
            summary: kind.to_string(),
        },
    )
}

#[derive(Clone, Default)]
struct RecordingRunner {
    runs: Arc<Mutex<Vec<Vec<ScheduledEvent>>>>,
}

impl RecordingRunner {
    fn runs(&self) -> Vec<Vec<ScheduledEvent>> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl BatchRunner for RecordingRunner {
    async fn run(&self, events: Vec<ScheduledEvent>) {
        self.runs.lock().unwrap().push(events);
    }
}

/// Blocks inside `run` until released, recording the batch on completion
#[derive(Clone, Default)]
struct BlockingRunner {
    started: Arc<AtomicBool>,
    gate: Arc<Notify>,
    runs: Arc<Mutex<Vec<Vec<ScheduledEvent>>>>,
}

#[async_trait]
impl BatchRunner for BlockingRunner {
    async fn run(&self, events: Vec<ScheduledEvent>) {
        self.started.store(true, Ordering::SeqCst);
        self.gate.notified().await;
        self.runs.lock().unwrap().push(events);
    }
}

fn scheduler_at(
    time: DateTime<Utc>,
) -> (BucketScheduler<RecordingRunner, FakeClock>, RecordingRunner, FakeClock) {
    let runner = RecordingRunner::default();
    let clock = FakeClock::at(time);
    (
        BucketScheduler::new(runner.clone(), clock.clone()),
        runner,
        clock,
    )
}

#[tokio::test]
async fn buckets_group_by_minute() {
    let now = base_time();
    let (scheduler, _, _) = scheduler_at(now);

    scheduler.reconcile(vec![
        event("us-weekly", EventKind::Restart, now + chrono::Duration::seconds(70)),
        event("us-long", EventKind::Restart, now + chrono::Duration::seconds(100)),
        event("train", EventKind::Wipe, now + chrono::Duration::minutes(30)),
    ]);

    assert_eq!(
        scheduler.bucket_keys(),
        vec!["2025-11-16T18:01:00Z", "2025-11-16T18:30:00Z"]
    );
    assert_eq!(scheduler.view("2025-11-16T18:01:00Z").unwrap().events, 2);
    assert_eq!(scheduler.view("2025-11-16T18:30:00Z").unwrap().events, 1);
    scheduler.shutdown();
}

#[tokio::test]
async fn past_events_never_create_buckets() {
    let now = base_time();
    let (scheduler, runner, _) = scheduler_at(now);

    scheduler.reconcile(vec![event(
        "us-weekly",
        EventKind::Restart,
        now - chrono::Duration::minutes(2),
    )]);

    assert!(scheduler.bucket_keys().is_empty());
    assert!(runner.runs().is_empty());
}

#[tokio::test]
async fn reconcile_with_identical_timeline_keeps_timers() {
    let now = base_time();
    let (scheduler, _, _) = scheduler_at(now);
    let timeline = vec![event(
        "us-weekly",
        EventKind::Restart,
        now + chrono::Duration::minutes(5),
    )];

    scheduler.reconcile(timeline.clone());
    let before = scheduler.view("2025-11-16T18:05:00Z").unwrap();

    scheduler.reconcile(timeline);
    let after = scheduler.view("2025-11-16T18:05:00Z").unwrap();

    assert_eq!(before.timer_generation, after.timer_generation);
    assert_eq!(scheduler.bucket_keys().len(), 1);
    scheduler.shutdown();
}

#[tokio::test(start_paused = true)]
async fn membership_update_does_not_reschedule_the_timer() {
    let now = base_time();
    let (scheduler, runner, _) = scheduler_at(now);
    let at = now + chrono::Duration::minutes(5);

    scheduler.reconcile(vec![
        event("a", EventKind::Restart, at),
        event("b", EventKind::Restart, at),
        event("c", EventKind::Restart, at),
    ]);
    let before = scheduler.view("2025-11-16T18:05:00Z").unwrap();

    // A later refresh changes the membership to {a, c, d}
    scheduler.reconcile(vec![
        event("a", EventKind::Restart, at),
        event("c", EventKind::Restart, at),
        event("d", EventKind::Wipe, at),
    ]);
    let after = scheduler.view("2025-11-16T18:05:00Z").unwrap();
    assert_eq!(before.timer_generation, after.timer_generation);

    tokio::time::sleep(std::time::Duration::from_secs(301)).await;

    let runs = runner.runs();
    assert_eq!(runs.len(), 1);
    let names: Vec<_> = runs[0].iter().map(|e| e.server.name.clone()).collect();
    assert_eq!(names, vec!["a", "c", "d"]);
}

#[tokio::test(start_paused = true)]
async fn removed_bucket_never_fires() {
    let now = base_time();
    let (scheduler, runner, _) = scheduler_at(now);

    scheduler.reconcile(vec![event(
        "us-weekly",
        EventKind::Restart,
        now + chrono::Duration::minutes(5),
    )]);
    scheduler.reconcile(vec![]);

    assert!(scheduler.bucket_keys().is_empty());
    tokio::time::sleep(std::time::Duration::from_secs(600)).await;
    assert!(runner.runs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn executing_bucket_is_immune_to_cancellation() {
    let now = base_time();
    let runner = BlockingRunner::default();
    let clock = FakeClock::at(now);
    let scheduler = BucketScheduler::new(runner.clone(), clock);
    let key = "2025-11-16T18:01:00Z";

    scheduler.reconcile(vec![event(
        "us-weekly",
        EventKind::Wipe,
        now + chrono::Duration::minutes(1),
    )]);

    // Let the timer fire; the runner blocks mid-batch
    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    while !runner.started.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }
    assert!(scheduler.view(key).unwrap().executing);

    // A refresh that drops the bucket must not cancel the in-flight batch
    scheduler.reconcile(vec![]);
    assert_eq!(scheduler.bucket_keys(), vec![key.to_string()]);
    assert!(scheduler.view(key).unwrap().executing);

    // Release the batch and let it complete
    runner.gate.notify_one();
    while runner.runs.lock().unwrap().is_empty() {
        tokio::task::yield_now().await;
    }
    assert!(!scheduler.view(key).unwrap().executing);

    // The next reconcile sweeps the finished bucket
    scheduler.reconcile(vec![]);
    assert!(scheduler.bucket_keys().is_empty());
}

#[tokio::test(start_paused = true)]
async fn bucket_fires_with_all_servers_in_timeline_order() {
    let now = base_time();
    let (scheduler, runner, _) = scheduler_at(now);
    let at = now + chrono::Duration::minutes(1);

    scheduler.reconcile(vec![
        event("us-weekly", EventKind::Restart, at),
        event("us-long", EventKind::Restart, at),
        event("us-build", EventKind::Wipe, at),
        event("train", EventKind::Wipe, at),
    ]);
    assert_eq!(scheduler.bucket_keys().len(), 1);

    tokio::time::sleep(std::time::Duration::from_secs(61)).await;

    let runs = runner.runs();
    assert_eq!(runs.len(), 1);
    let names: Vec<_> = runs[0].iter().map(|e| e.server.name.clone()).collect();
    assert_eq!(names, vec!["us-weekly", "us-long", "us-build", "train"]);
}

#[tokio::test(start_paused = true)]
async fn later_events_form_fresh_buckets_without_disturbing_earlier_ones() {
    let now = base_time();
    let (scheduler, runner, _) = scheduler_at(now);
    let soon = now + chrono::Duration::minutes(1);
    let later = now + chrono::Duration::minutes(61);

    scheduler.reconcile(vec![event("us-weekly", EventKind::Restart, soon)]);
    let first = scheduler.view("2025-11-16T18:01:00Z").unwrap();

    // A later refresh sees the event that entered the lookahead window
    scheduler.reconcile(vec![
        event("us-weekly", EventKind::Restart, soon),
        event("us-long", EventKind::Wipe, later),
    ]);

    let unchanged = scheduler.view("2025-11-16T18:01:00Z").unwrap();
    assert_eq!(first.timer_generation, unchanged.timer_generation);
    let fresh = scheduler.view("2025-11-16T19:01:00Z").unwrap();
    assert_ne!(fresh.timer_generation, first.timer_generation);

    // The earlier bucket fires on time
    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    assert_eq!(runner.runs().len(), 1);
    scheduler.shutdown();
}

#[tokio::test]
async fn events_returns_the_current_timeline() {
    let now = base_time();
    let (scheduler, _, _) = scheduler_at(now);
    let timeline = vec![
        event("us-weekly", EventKind::Restart, now + chrono::Duration::minutes(5)),
        event("train", EventKind::Wipe, now + chrono::Duration::minutes(10)),
    ];

    scheduler.reconcile(timeline.clone());
    assert_eq!(scheduler.events(), timeline);
    scheduler.shutdown();
}

#[tokio::test(start_paused = true)]
async fn wait_idle_returns_once_batches_finish() {
    let now = base_time();
    let runner = BlockingRunner::default();
    let clock = FakeClock::at(now);
    let scheduler = BucketScheduler::new(runner.clone(), clock);

    scheduler.reconcile(vec![event(
        "us-weekly",
        EventKind::Restart,
        now + chrono::Duration::minutes(1),
    )]);

    tokio::time::sleep(std::time::Duration::from_secs(61)).await;
    while !runner.started.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }

    // Ceiling hit while the batch is stuck
    assert!(!scheduler.wait_idle(std::time::Duration::from_secs(1)).await);

    runner.gate.notify_one();
    assert!(scheduler.wait_idle(std::time::Duration::from_secs(10)).await);
}
