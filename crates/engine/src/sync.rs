// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync workers: refresh server installations from the branch trees
//!
//! Each worker holds the read locks for both trees while it copies, so a
//! concurrent install (write side) can never hand it a half-written tree.

use crate::branch_lock::BranchLocks;
use crate::trees::TreeKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use wd_adapters::mirror::{Mirror, MirrorError};
use wd_core::Server;

/// Stale game artefacts removed before mirroring the game tree
pub const GAME_STALE_DIRS: &[&str] = &["RustDedicated_Data", "Bundles", "steamapps", "steamcmd"];

/// Stale mod artefacts removed before mirroring the mod tree
pub const MOD_STALE_DIRS: &[&str] = &["carbon/native", "carbon/managed", "carbon/tools"];

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{tree} mirror failed for {server}: {source}")]
    Mirror {
        tree: TreeKind,
        server: String,
        #[source]
        source: MirrorError,
    },

    #[error("failed to sync servers:{}", format_failures(.0))]
    Batch(Vec<(String, String)>),
}

fn format_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(server, error)| format!("\n  - {}: {}", server, error))
        .collect()
}

/// Refreshes server installations from the shared branch trees
#[derive(Clone)]
pub struct SyncWorker<M> {
    game_base: PathBuf,
    mod_base: PathBuf,
    locks: Arc<BranchLocks>,
    mirror: M,
}

impl<M: Mirror> SyncWorker<M> {
    pub fn new(
        game_base: impl Into<PathBuf>,
        mod_base: impl Into<PathBuf>,
        locks: Arc<BranchLocks>,
        mirror: M,
    ) -> Self {
        Self {
            game_base: game_base.into(),
            mod_base: mod_base.into(),
            locks,
            mirror,
        }
    }

    /// Refresh one server from its branch trees
    pub async fn sync_one(&self, server: &Server) -> Result<(), SyncError> {
        let branch = server.branch();
        tracing::info!(server = %server.name, branch, "syncing server");

        let _game_lock = self.locks.read(TreeKind::Game, branch).await;
        let _mod_lock = self.locks.read(TreeKind::Mod, branch).await;

        remove_stale_dirs(&server.path, GAME_STALE_DIRS).await;
        self.mirror
            .mirror(&self.game_base.join(branch), &server.path)
            .await
            .map_err(|source| SyncError::Mirror {
                tree: TreeKind::Game,
                server: server.name.clone(),
                source,
            })?;

        remove_stale_dirs(&server.path, MOD_STALE_DIRS).await;
        self.mirror
            .mirror(&self.mod_base.join(branch), &server.path)
            .await
            .map_err(|source| SyncError::Mirror {
                tree: TreeKind::Mod,
                server: server.name.clone(),
                source,
            })?;

        tracing::info!(server = %server.name, "server synced");
        Ok(())
    }

    /// Refresh all servers concurrently; reports every failure
    pub async fn sync_many(&self, servers: &[Server]) -> Result<(), SyncError> {
        let mut tasks = JoinSet::new();
        for server in servers.iter().cloned() {
            let worker = self.clone();
            tasks.spawn(async move {
                let result = worker.sync_one(&server).await;
                (server.name, result)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((server, Err(error))) => failures.push((server, error.to_string())),
                Err(join_error) => failures.push(("sync task".to_string(), join_error.to_string())),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            failures.sort();
            Err(SyncError::Batch(failures))
        }
    }
}

async fn remove_stale_dirs(base: &Path, dirs: &[&str]) {
    for dir in dirs {
        let path = base.join(dir);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove stale directory");
            }
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
