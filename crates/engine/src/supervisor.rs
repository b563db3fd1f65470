// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor loop
//!
//! Drives the periodic activities: config reload (with server add/remove
//! detection), calendar refresh cadence, upstream update checks, and the
//! post-refresh map-preparation pass. All of it stops on the shutdown
//! token; in-flight batches are waited on by the daemon, not here.

use crate::executor::ScriptPaths;
use crate::poller::CalendarPoller;
use crate::scheduler::{BatchRunner, BucketScheduler};
use crate::trees::{TreeKind, TreeManager};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio_util::sync::CancellationToken;
use wd_adapters::calendar::CalendarFetcher;
use wd_adapters::depot::{GameDepot, ModDepot};
use wd_adapters::notify::{Notification, NotifyAdapter};
use wd_adapters::script::ScriptRunner;
use wd_core::{Clock, Config, EventKind, ScheduledEvent, Server};

/// How often the config file is re-read
pub const CONFIG_RELOAD_INTERVAL: StdDuration = StdDuration::from_secs(10);

/// How often upstream builds are checked
pub const UPDATE_CHECK_INTERVAL: StdDuration = StdDuration::from_secs(120);

/// Everything the supervisor drives
pub struct SupervisorDeps<F, S, N, C, R, G, M> {
    pub poller: CalendarPoller<F, N, C>,
    pub scheduler: BucketScheduler<R, C>,
    pub trees: Arc<TreeManager<G, M, N>>,
    pub scripts: S,
    pub script_paths: ScriptPaths,
    pub notify: N,
    pub clock: C,
}

pub struct Supervisor<F, S, N, C, R, G, M> {
    config_path: PathBuf,
    config: Config,
    poller: CalendarPoller<F, N, C>,
    scheduler: BucketScheduler<R, C>,
    trees: Arc<TreeManager<G, M, N>>,
    scripts: S,
    script_paths: ScriptPaths,
    notify: N,
    clock: C,
    map_prep_running: Arc<AtomicBool>,
    last_refresh: Option<DateTime<Utc>>,
}

impl<F, S, N, C, R, G, M> Supervisor<F, S, N, C, R, G, M>
where
    F: CalendarFetcher,
    S: ScriptRunner,
    N: NotifyAdapter,
    C: Clock,
    R: BatchRunner,
    G: GameDepot,
    M: ModDepot,
{
    pub fn new(
        config_path: PathBuf,
        config: Config,
        deps: SupervisorDeps<F, S, N, C, R, G, M>,
    ) -> Self {
        Self {
            config_path,
            config,
            poller: deps.poller,
            scheduler: deps.scheduler,
            trees: deps.trees,
            scripts: deps.scripts,
            script_paths: deps.script_paths,
            notify: deps.notify,
            clock: deps.clock,
            map_prep_running: Arc::new(AtomicBool::new(false)),
            last_refresh: None,
        }
    }

    /// Run until the shutdown token fires
    pub async fn run(&mut self, shutdown: CancellationToken) {
        self.notify
            .emit(Notification::info(
                "Maintenance Service Started",
                format!(
                    "warden has started and is monitoring **{}** server(s)",
                    self.config.servers.len()
                ),
            ))
            .await;

        if self.config.servers.is_empty() {
            tracing::info!("no servers configured");
        } else {
            tracing::info!("checking server installations");
            self.ensure_installed().await;
            tracing::info!("performing initial calendar update");
            self.refresh().await;
        }

        let mut config_tick = tokio::time::interval_at(
            tokio::time::Instant::now() + CONFIG_RELOAD_INTERVAL,
            CONFIG_RELOAD_INTERVAL,
        );
        let mut update_tick = tokio::time::interval_at(
            tokio::time::Instant::now() + UPDATE_CHECK_INTERVAL,
            UPDATE_CHECK_INTERVAL,
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("shutdown requested, stopping supervisor");
                    break;
                }
                _ = config_tick.tick() => self.reload_config().await,
                _ = update_tick.tick() => self.check_for_updates().await,
            }
        }
    }

    async fn reload_config(&mut self) {
        let config = match Config::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "failed to reload config");
                return;
            }
        };

        let (added, removed) = server_changes(&self.config.servers, &config.servers);
        let changed = !added.is_empty() || !removed.is_empty();

        for server in &removed {
            tracing::info!(server = %server.name, path = %server.path.display(), "server removed");
            self.notify
                .emit(Notification::warning(
                    "Server Removed",
                    format!(
                        "Server **{}** has been removed from monitoring\n\nPath: `{}`",
                        server.name,
                        server.path.display()
                    ),
                ))
                .await;
        }
        for server in &added {
            tracing::info!(server = %server.name, path = %server.path.display(), "server added");
            self.notify
                .emit(Notification::success(
                    "Server Added",
                    format!(
                        "Server **{}** has been added to monitoring\n\nPath: `{}`",
                        server.name,
                        server.path.display()
                    ),
                ))
                .await;
        }

        self.config = config;

        if changed {
            tracing::info!("server configuration changed, updating schedules");
            self.refresh().await;
        } else if self.should_refresh() {
            self.refresh().await;
        }
    }

    fn should_refresh(&self) -> bool {
        !self.config.servers.is_empty()
            && refresh_due(
                self.last_refresh,
                self.clock.now_utc(),
                self.config.check_interval,
            )
    }

    async fn refresh(&mut self) {
        let timeline = self.poller.refresh(&self.config.servers).await;
        self.scheduler.reconcile(timeline);
        self.last_refresh = Some(self.clock.now_utc());
        self.spawn_map_prep();
    }

    /// Background pass over upcoming wipes; one run at a time
    fn spawn_map_prep(&self) {
        if self.config.map_generation_hours == 0 || self.config.servers.is_empty() {
            return;
        }

        let events = self.scheduler.events();
        let servers = self.config.servers.clone();
        let window = Duration::hours(i64::from(self.config.map_generation_hours));
        let scripts = self.scripts.clone();
        let script = self.script_paths.generate_maps.clone();
        let notify = self.notify.clone();
        let clock = self.clock.clone();
        let running = Arc::clone(&self.map_prep_running);

        tokio::spawn(async move {
            if running.swap(true, Ordering::SeqCst) {
                tracing::info!("map preparation already in progress, skipping");
                return;
            }

            let paths = map_prep_paths(&events, &servers, clock.now_utc(), window);
            if !paths.is_empty() {
                tracing::info!(servers = paths.len(), "running map preparation");
                if let Err(e) = scripts.run(&script, &paths).await {
                    tracing::error!(error = %e, "map preparation failed");
                    notify
                        .emit(Notification::error(
                            "Map Generation Failed",
                            format!("Failed to generate maps: {}", e),
                        ))
                        .await;
                }
            }

            running.store(false, Ordering::SeqCst);
        });
    }

    async fn check_for_updates(&self) {
        let branches = self.config.branches();
        if branches.is_empty() {
            return;
        }

        tracing::info!(branches = branches.len(), "checking for upstream updates");
        for branch in &branches {
            for kind in [TreeKind::Game, TreeKind::Mod] {
                match self.trees.check_for_updates(kind, branch).await {
                    Ok((true, identity)) => {
                        tracing::info!(%kind, %branch, %identity, "update detected, installing");
                        if let Err(e) = self.trees.install(kind, branch).await {
                            tracing::error!(%kind, %branch, error = %e, "update install failed");
                        }
                    }
                    Ok((false, identity)) => {
                        tracing::debug!(%kind, %branch, %identity, "up to date");
                    }
                    Err(e) => {
                        tracing::warn!(%kind, %branch, error = %e, "update check failed");
                    }
                }
            }
        }
    }

    async fn ensure_installed(&self) {
        let branches = self.config.branches();
        for branch in &branches {
            for kind in [TreeKind::Game, TreeKind::Mod] {
                if let Err(e) = self.trees.ensure_installed(kind, branch).await {
                    tracing::error!(%kind, %branch, error = %e, "initial install failed");
                }
            }
        }
    }
}

/// Whether the periodic refresh cadence has elapsed
///
/// A never-refreshed supervisor is always due; `check_interval = 0` makes
/// every tick due.
pub fn refresh_due(last: Option<DateTime<Utc>>, now: DateTime<Utc>, check_interval: u64) -> bool {
    match last {
        None => true,
        Some(last) => now - last >= Duration::seconds(check_interval as i64),
    }
}

/// Servers added and removed between two configs, compared by path
pub fn server_changes(old: &[Server], new: &[Server]) -> (Vec<Server>, Vec<Server>) {
    let old_paths: HashSet<&PathBuf> = old.iter().map(|s| &s.path).collect();
    let new_paths: HashSet<&PathBuf> = new.iter().map(|s| &s.path).collect();

    let added = new
        .iter()
        .filter(|s| !old_paths.contains(&s.path))
        .cloned()
        .collect();
    let removed = old
        .iter()
        .filter(|s| !new_paths.contains(&s.path))
        .cloned()
        .collect();

    (added, removed)
}

/// Paths of map-enabled servers with a wipe due within the window
pub fn map_prep_paths(
    events: &[ScheduledEvent],
    servers: &[Server],
    now: DateTime<Utc>,
    window: Duration,
) -> Vec<String> {
    let needing: HashSet<&str> = events
        .iter()
        .filter(|e| e.event.kind == EventKind::Wipe)
        .filter(|e| {
            let until = e.scheduled - now;
            until > Duration::zero() && until <= window
        })
        .map(|e| e.server.name.as_str())
        .collect();

    servers
        .iter()
        .filter(|s| s.generate_map && needing.contains(s.name.as_str()))
        .map(|s| s.path.display().to_string())
        .collect()
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
