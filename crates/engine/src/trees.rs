// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared binary tree manager
//!
//! Two trees live under shared base directories, one branch per
//! subdirectory: the game server tree (identity in `buildid`) and the mod
//! framework tree (identity in `version.txt`). Install wipes and rewrites
//! the whole branch subtree while holding the branch write lock, so sync
//! workers never observe a partial tree.

use crate::branch_lock::{normalise, BranchLocks};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use wd_adapters::depot::{DepotError, GameDepot, ModDepot};
use wd_adapters::notify::{Notification, NotifyAdapter};

/// Which shared tree an operation targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Game,
    Mod,
}

impl TreeKind {
    /// File at the branch root recording the installed identity
    pub fn identity_file(self) -> &'static str {
        match self {
            TreeKind::Game => "buildid",
            TreeKind::Mod => "version.txt",
        }
    }

    fn title(self) -> &'static str {
        match self {
            TreeKind::Game => "Game Server",
            TreeKind::Mod => "Mod Framework",
        }
    }

    fn identity_label(self) -> &'static str {
        match self {
            TreeKind::Game => "Build ID",
            TreeKind::Mod => "Version",
        }
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeKind::Game => write!(f, "game"),
            TreeKind::Mod => write!(f, "mod"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("{kind} install failed for branch {branch}: {source}")]
    Install {
        kind: TreeKind,
        branch: String,
        #[source]
        source: DepotError,
    },

    #[error("{kind} update check failed for branch {branch}: {source}")]
    UpdateCheck {
        kind: TreeKind,
        branch: String,
        #[source]
        source: DepotError,
    },

    #[error("io error at {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
}

/// Manages installs and upgrades of both shared trees
pub struct TreeManager<G, M, N> {
    game_base: PathBuf,
    mod_base: PathBuf,
    game: G,
    mods: M,
    notify: N,
    locks: Arc<BranchLocks>,
    /// Branches with an install in flight; a second request returns early
    installing: Mutex<HashSet<(TreeKind, String)>>,
}

impl<G, M, N> TreeManager<G, M, N>
where
    G: GameDepot,
    M: ModDepot,
    N: NotifyAdapter,
{
    pub fn new(
        game_base: impl Into<PathBuf>,
        mod_base: impl Into<PathBuf>,
        game: G,
        mods: M,
        notify: N,
        locks: Arc<BranchLocks>,
    ) -> Self {
        Self {
            game_base: game_base.into(),
            mod_base: mod_base.into(),
            game,
            mods,
            notify,
            locks,
            installing: Mutex::new(HashSet::new()),
        }
    }

    fn base(&self, kind: TreeKind) -> &Path {
        match kind {
            TreeKind::Game => &self.game_base,
            TreeKind::Mod => &self.mod_base,
        }
    }

    /// Branch directory within a tree
    pub fn branch_dir(&self, kind: TreeKind, branch: &str) -> PathBuf {
        self.base(kind).join(normalise(branch))
    }

    /// The recorded identity of an installed branch, if any
    pub fn installed_identity(&self, kind: TreeKind, branch: &str) -> Option<String> {
        let path = self.branch_dir(kind, branch).join(kind.identity_file());
        std::fs::read_to_string(path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Install a branch unless it is already present
    pub async fn ensure_installed(&self, kind: TreeKind, branch: &str) -> Result<(), TreeError> {
        if self.installed_identity(kind, branch).is_some() {
            tracing::debug!(%kind, branch = normalise(branch), "branch already installed");
            return Ok(());
        }

        tracing::info!(%kind, branch = normalise(branch), "branch not installed, installing");
        self.install(kind, branch).await
    }

    /// Install (or reinstall) a branch
    ///
    /// Re-entrant requests for the same `(tree, branch)` return without
    /// blocking. Different branches install in parallel.
    pub async fn install(&self, kind: TreeKind, branch: &str) -> Result<(), TreeError> {
        let branch = normalise(branch).to_string();

        {
            let mut installing = self.installing.lock().unwrap_or_else(|e| e.into_inner());
            if !installing.insert((kind, branch.clone())) {
                tracing::info!(%kind, %branch, "branch is already being installed, skipping");
                return Ok(());
            }
        }

        let result = self.install_locked(kind, &branch).await;

        self.installing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(kind, branch));

        result
    }

    async fn install_locked(&self, kind: TreeKind, branch: &str) -> Result<(), TreeError> {
        // Write lock: sync workers on this branch wait for the install
        let _write = self.locks.write(kind, branch).await;

        let dir = self.branch_dir(kind, branch);
        let previous = self.installed_identity(kind, branch);
        tracing::info!(%kind, branch, dir = %dir.display(), "installing branch");

        if let Err(e) = recreate_dir(&dir).await {
            self.notify_install_failure(kind, branch, &e).await;
            return Err(e);
        }

        let installed = match kind {
            TreeKind::Game => self.game.install(branch, &dir).await,
            TreeKind::Mod => self.mods.install(branch, &dir).await,
        };

        let identity = match installed {
            Ok(identity) => identity,
            Err(source) => {
                let error = TreeError::Install {
                    kind,
                    branch: branch.to_string(),
                    source,
                };
                self.notify_install_failure(kind, branch, &error).await;
                return Err(error);
            }
        };

        if identity.is_empty() {
            tracing::warn!(%kind, branch, "install reported no identity");
        } else {
            let identity_path = dir.join(kind.identity_file());
            if let Err(e) = tokio::fs::write(&identity_path, &identity).await {
                tracing::warn!(path = %identity_path.display(), error = %e, "could not record identity");
            }
        }

        tracing::info!(%kind, branch, %identity, "branch installed");
        self.notify_install_success(kind, branch, previous.as_deref(), &identity)
            .await;

        Ok(())
    }

    async fn notify_install_success(
        &self,
        kind: TreeKind,
        branch: &str,
        previous: Option<&str>,
        identity: &str,
    ) {
        match previous {
            None => {
                self.notify
                    .emit(Notification::success(
                        format!("{} Installation Complete", kind.title()),
                        format!(
                            "{} branch **{}** installed successfully\n\n{}: **{}**",
                            kind.title(),
                            branch,
                            kind.identity_label(),
                            identity
                        ),
                    ))
                    .await;
            }
            Some(previous) if previous != identity => {
                self.notify
                    .emit(Notification::success(
                        format!("{} Update Complete", kind.title()),
                        format!(
                            "{} branch **{}** updated\n\nFrom: **{}**\nTo: **{}**",
                            kind.title(),
                            branch,
                            previous,
                            identity
                        ),
                    ))
                    .await;
            }
            // Reinstall of the same identity: no announcement
            Some(_) => {}
        }
    }

    async fn notify_install_failure(&self, kind: TreeKind, branch: &str, error: &TreeError) {
        self.notify
            .emit(Notification::error(
                format!("{} Installation Failed", kind.title()),
                format!(
                    "Failed to install {} branch **{}**\n\n{}",
                    kind.title(),
                    branch,
                    error
                ),
            ))
            .await;
    }

    /// Compare the recorded identity against upstream
    ///
    /// Returns `(true, latest)` when an update is available, `(false,
    /// current)` otherwise. A branch that is not installed reports no
    /// update.
    pub async fn check_for_updates(
        &self,
        kind: TreeKind,
        branch: &str,
    ) -> Result<(bool, String), TreeError> {
        let Some(current) = self.installed_identity(kind, branch) else {
            return Ok((false, String::new()));
        };

        let latest = match kind {
            TreeKind::Game => self.game.latest(branch).await,
            TreeKind::Mod => self.mods.latest(branch).await,
        }
        .map_err(|source| TreeError::UpdateCheck {
            kind,
            branch: branch.to_string(),
            source,
        })?;

        if latest != current {
            tracing::info!(%kind, branch, %current, %latest, "update available");
            self.notify
                .emit(Notification::info(
                    format!("{} Update Available", kind.title()),
                    format!(
                        "{} branch **{}** has an update available\n\nCurrent: **{}**\nAvailable: **{}**",
                        kind.title(),
                        normalise(branch),
                        current,
                        latest
                    ),
                ))
                .await;
            return Ok((true, latest));
        }

        Ok((false, current))
    }
}

async fn recreate_dir(dir: &Path) -> Result<(), TreeError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(TreeError::Io(dir.to_path_buf(), e)),
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| TreeError::Io(dir.to_path_buf(), e))
}

#[cfg(test)]
#[path = "trees_tests.rs"]
mod tests;
