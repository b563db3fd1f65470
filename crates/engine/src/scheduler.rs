// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bucket scheduler
//!
//! Events due in the same wall-clock minute share one bucket keyed by the
//! minute-truncated RFC3339 time. Each bucket owns a single-shot timer task;
//! `reconcile` updates bucket membership in place without touching the
//! timer, and a bucket that has begun executing is immune to cancellation.
//!
//! The state mutex is held only for map manipulation, never across an await.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use wd_core::{truncate_to_minute, Clock, ScheduledEvent};

/// Runs one bucket's events at fire time
#[async_trait]
pub trait BatchRunner: Send + Sync + 'static {
    async fn run(&self, events: Vec<ScheduledEvent>);
}

/// Observable snapshot of one bucket
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketView {
    pub key: String,
    pub fire_at: DateTime<Utc>,
    pub events: usize,
    pub executing: bool,
    /// Stable for the lifetime of the bucket: reconciles that only change
    /// membership never replace the timer
    pub timer_generation: u64,
}

struct Bucket {
    fire_at: DateTime<Utc>,
    events: Vec<ScheduledEvent>,
    timer: JoinHandle<()>,
    timer_generation: u64,
    executing: bool,
}

#[derive(Default)]
struct State {
    buckets: HashMap<String, Bucket>,
    timeline: Vec<ScheduledEvent>,
    next_generation: u64,
}

struct Inner<R, C> {
    state: Mutex<State>,
    runner: R,
    clock: C,
}

/// Owns the bucket map and all timer tasks
pub struct BucketScheduler<R, C> {
    inner: Arc<Inner<R, C>>,
}

impl<R, C> Clone for BucketScheduler<R, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: BatchRunner, C: Clock> BucketScheduler<R, C> {
    pub fn new(runner: R, clock: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                runner,
                clock,
            }),
        }
    }

    /// Bring the bucket map in line with a fresh timeline snapshot
    ///
    /// One atomic mutation: surviving buckets get their event list replaced
    /// (timer untouched), new keys get a bucket and a timer, vanished keys
    /// are cancelled and removed unless currently executing. Keys in the
    /// past never create a bucket.
    pub fn reconcile(&self, timeline: Vec<ScheduledEvent>) {
        let now = self.inner.clock.now_utc();

        let mut groups: HashMap<String, Vec<ScheduledEvent>> = HashMap::new();
        for event in &timeline {
            groups.entry(event.minute_key()).or_default().push(event.clone());
        }

        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        state.timeline = timeline;

        state.buckets.retain(|key, bucket| {
            if groups.contains_key(key) {
                return true;
            }
            if bucket.executing {
                tracing::info!(key = %key, "keeping bucket (currently executing)");
                return true;
            }
            bucket.timer.abort();
            tracing::info!(key = %key, "cancelled bucket");
            false
        });

        for (key, events) in groups {
            let fire_at = truncate_to_minute(events[0].scheduled);
            if fire_at < now {
                tracing::info!(key = %key, "skipping bucket in the past");
                continue;
            }

            match state.buckets.get_mut(&key) {
                Some(bucket) => {
                    tracing::debug!(key = %key, servers = events.len(), "updated bucket membership");
                    bucket.events = events;
                }
                None => {
                    let timer_generation = state.next_generation;
                    state.next_generation += 1;
                    let timer = self.spawn_timer(key.clone(), fire_at);
                    tracing::info!(key = %key, servers = events.len(), "scheduled bucket");
                    state.buckets.insert(
                        key,
                        Bucket {
                            fire_at,
                            events,
                            timer,
                            timer_generation,
                            executing: false,
                        },
                    );
                }
            }
        }
    }

    fn spawn_timer(&self, key: String, fire_at: DateTime<Utc>) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let delay = (fire_at - inner.clock.now_utc())
                .to_std()
                .unwrap_or(Duration::ZERO);
            tokio::time::sleep(delay).await;
            fire(inner, key).await;
        })
    }

    /// Current timeline snapshot, as last handed to `reconcile`
    pub fn events(&self) -> Vec<ScheduledEvent> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .timeline
            .clone()
    }

    /// Sorted keys of live buckets
    pub fn bucket_keys(&self) -> Vec<String> {
        let state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = state.buckets.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Snapshot of one bucket
    pub fn view(&self, key: &str) -> Option<BucketView> {
        let state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        state.buckets.get(key).map(|bucket| BucketView {
            key: key.to_string(),
            fire_at: bucket.fire_at,
            events: bucket.events.len(),
            executing: bucket.executing,
            timer_generation: bucket.timer_generation,
        })
    }

    /// Whether any bucket is currently executing
    pub fn has_executing(&self) -> bool {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .buckets
            .values()
            .any(|bucket| bucket.executing)
    }

    /// Wait for in-flight buckets to finish, up to a ceiling
    ///
    /// Returns true when idle, false when the ceiling was hit.
    pub async fn wait_idle(&self, ceiling: Duration) -> bool {
        let poll = async {
            while self.has_executing() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };
        tokio::time::timeout(ceiling, poll).await.is_ok()
    }

    /// Abandon all pending buckets; executing buckets run to completion
    pub fn shutdown(&self) {
        let state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        for (key, bucket) in state.buckets.iter() {
            if !bucket.executing {
                bucket.timer.abort();
                tracing::debug!(key = %key, "abandoned pending bucket");
            }
        }
    }
}

/// Timer wakeup: snapshot under the mutex, execute outside it
async fn fire<R: BatchRunner, C: Clock>(inner: Arc<Inner<R, C>>, key: String) {
    let snapshot = {
        let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(bucket) = state.buckets.get_mut(&key) else {
            tracing::debug!(key = %key, "bucket vanished before firing");
            return;
        };
        // From here on, reconcile must not cancel this bucket
        bucket.executing = true;
        bucket.events.clone()
    };

    if snapshot.is_empty() {
        tracing::info!(key = %key, "no events left at execution time, skipping");
        clear_executing(&inner, &key);
        return;
    }

    tracing::info!(key = %key, servers = snapshot.len(), "bucket firing");
    inner.runner.run(snapshot).await;
    clear_executing(&inner, &key);
}

fn clear_executing<R, C>(inner: &Inner<R, C>, key: &str) {
    let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(bucket) = state.buckets.get_mut(key) {
        bucket.executing = false;
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
