// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch executor
//!
//! Runs one bucket's lifecycle: delay, stop, sync, wipe, pre-start hook,
//! start. Stop/sync/start failures abort the batch; the hook is
//! best-effort; wipe file deletions are individually best-effort.

use crate::scheduler::BatchRunner;
use crate::sync::{SyncError, SyncWorker};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use wd_adapters::mirror::Mirror;
use wd_adapters::notify::{Notification, NotifyAdapter};
use wd_adapters::script::{ScriptError, ScriptRunner};
use wd_core::{wildcard, EventKind, ScheduledEvent, Server};

/// File patterns deleted from the server data directory on wipe
pub const WIPE_PATTERNS: &[&str] = &["*.map", "*.sav*", "player.states.*.db*", "sv.files.*.db*"];

/// Additional pattern when the server wipes blueprints
pub const BLUEPRINT_PATTERN: &str = "player.blueprints.*";

/// Locations of the operator-supplied lifecycle scripts
#[derive(Clone, Debug)]
pub struct ScriptPaths {
    pub stop: PathBuf,
    pub start: PathBuf,
    pub pre_start_hook: PathBuf,
    pub generate_maps: PathBuf,
}

impl ScriptPaths {
    /// Conventional script names under one directory
    pub fn under(dir: &Path) -> Self {
        Self {
            stop: dir.join("stop-servers.sh"),
            start: dir.join("start-servers.sh"),
            pre_start_hook: dir.join("pre-start-hook.sh"),
            generate_maps: dir.join("generate-maps.sh"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to stop servers: {0}")]
    Stop(#[source] ScriptError),

    #[error("Failed to update servers: {0}")]
    Sync(#[source] SyncError),

    #[error("Failed to start servers: {0}")]
    Start(#[source] ScriptError),
}

/// Executes one bucket of events as a single batched lifecycle
pub struct BatchExecutor<M, S, N> {
    sync: SyncWorker<M>,
    scripts: S,
    notify: N,
    paths: ScriptPaths,
    event_delay: Duration,
}

impl<M, S, N> BatchExecutor<M, S, N>
where
    M: Mirror,
    S: ScriptRunner,
    N: NotifyAdapter,
{
    pub fn new(
        sync: SyncWorker<M>,
        scripts: S,
        notify: N,
        paths: ScriptPaths,
        event_delay: Duration,
    ) -> Self {
        Self {
            sync,
            scripts,
            notify,
            paths,
            event_delay,
        }
    }

    /// Run the five-step batch for one bucket's events
    pub async fn execute_batch(&self, events: Vec<ScheduledEvent>) -> Result<(), BatchError> {
        if events.is_empty() {
            return Ok(());
        }

        let servers: Vec<Server> = events.iter().map(|e| e.server.clone()).collect();
        let wipe_paths: HashSet<PathBuf> = events
            .iter()
            .filter(|e| e.event.kind == EventKind::Wipe)
            .map(|e| e.server.path.clone())
            .collect();
        let wipe_count = wipe_paths.len();
        let restart_count = servers.len() - wipe_count;

        tracing::info!(
            servers = servers.len(),
            restarts = restart_count,
            wipes = wipe_count,
            "executing batch event"
        );

        if !self.event_delay.is_zero() {
            tracing::info!(delay_secs = self.event_delay.as_secs(), "waiting before executing");
            tokio::time::sleep(self.event_delay).await;
        }

        let summary = batch_summary(&servers, restart_count, wipe_count);
        self.notify
            .emit(Notification::info(
                "Batch Event Starting",
                format!("Starting batch event for {}", summary),
            ))
            .await;

        let paths: Vec<String> = servers
            .iter()
            .map(|s| s.path.display().to_string())
            .collect();

        // Step 1: stop all servers at once
        tracing::info!(servers = servers.len(), "stopping servers");
        if let Err(e) = self.scripts.run(&self.paths.stop, &paths).await {
            return Err(self.fail(BatchError::Stop(e)).await);
        }

        // Step 2: refresh all installations in parallel
        tracing::info!("updating server installations");
        if let Err(e) = self.sync.sync_many(&servers).await {
            return Err(self.fail(BatchError::Sync(e)).await);
        }

        // Step 3: wipe state for wipe servers only
        if !wipe_paths.is_empty() {
            tracing::info!(servers = wipe_paths.len(), "performing wipe cleanup");
            for server in &servers {
                if wipe_paths.contains(&server.path) {
                    wipe_server_data(server).await;
                }
            }
        }

        // Step 4: pre-start hook, best-effort
        if let Err(e) = self.scripts.run(&self.paths.pre_start_hook, &paths).await {
            tracing::warn!(error = %e, "pre-start hook failed, continuing");
        }

        // Step 5: start all servers at once
        tracing::info!(servers = servers.len(), "starting servers");
        if let Err(e) = self.scripts.run(&self.paths.start, &paths).await {
            return Err(self.fail(BatchError::Start(e)).await);
        }

        self.notify
            .emit(Notification::success(
                "Batch Event Complete",
                format!("Successfully completed batch event for {}", summary),
            ))
            .await;
        tracing::info!("batch event completed");

        Ok(())
    }

    async fn fail(&self, error: BatchError) -> BatchError {
        tracing::error!(error = %error, "batch event failed");
        self.notify
            .emit(Notification::error("Batch Event Failed", error.to_string()))
            .await;
        error
    }
}

fn batch_summary(servers: &[Server], restart_count: usize, wipe_count: usize) -> String {
    let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
    format!(
        "**{}** server(s):\n• {}\n\n**{} restart(s), {} wipe(s)**",
        servers.len(),
        names.join("\n• "),
        restart_count,
        wipe_count
    )
}

/// Delete map/save/state files under the server's identity directory
///
/// Missing directory and zero matches are fine; individual delete failures
/// are logged and skipped.
pub async fn wipe_server_data(server: &Server) {
    let data_dir = server.path.join("server").join(server.identity());
    tracing::info!(server = %server.name, dir = %data_dir.display(), "wiping server data");

    let mut patterns: Vec<&str> = WIPE_PATTERNS.to_vec();
    if server.wipe_blueprints {
        tracing::info!(server = %server.name, "including blueprints in wipe");
        patterns.push(BLUEPRINT_PATTERN);
    }

    let mut entries = match tokio::fs::read_dir(&data_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %data_dir.display(), error = %e, "no server data to wipe");
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %data_dir.display(), error = %e, "failed to read data directory");
                break;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if !patterns.iter().any(|pattern| wildcard::matches(pattern, &name)) {
            continue;
        }

        tracing::info!(file = %entry.path().display(), "deleting");
        if let Err(e) = tokio::fs::remove_file(entry.path()).await {
            tracing::warn!(file = %entry.path().display(), error = %e, "failed to delete");
        }
    }
}

#[async_trait]
impl<M, S, N> BatchRunner for BatchExecutor<M, S, N>
where
    M: Mirror,
    S: ScriptRunner,
    N: NotifyAdapter,
{
    async fn run(&self, events: Vec<ScheduledEvent>) {
        // Failures were already notified and logged; the bucket is consumed
        // either way.
        let _ = self.execute_batch(events).await;
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
