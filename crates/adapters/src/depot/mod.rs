// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Depot adapters: sources of the shared binary trees
//!
//! The game depot is steamcmd; the mod depot is an HTTP release feed. Both
//! report an opaque identity string (build id / version) that the tree
//! manager records at the branch root.

mod release;
mod steam;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use release::ReleaseModDepot;
pub use steam::SteamCmdDepot;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDepot;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DepotError {
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed after {attempts} attempt(s): {detail}")]
    Failed {
        tool: String,
        attempts: u32,
        detail: String,
    },

    #[error("io error at {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("no identity found for branch {0}")]
    NoIdentity(String),
}

/// Source of the game server tree
#[async_trait]
pub trait GameDepot: Clone + Send + Sync + 'static {
    /// Install (or reinstall) a branch into `dest`; returns the installed
    /// build id, or an empty string when the id cannot be determined
    async fn install(&self, branch: &str, dest: &Path) -> Result<String, DepotError>;

    /// Latest build id published upstream for a branch
    async fn latest(&self, branch: &str) -> Result<String, DepotError>;
}

/// Source of the mod framework tree
#[async_trait]
pub trait ModDepot: Clone + Send + Sync + 'static {
    /// Install (or reinstall) a branch into `dest`; returns the installed
    /// version, or an empty string when the version cannot be determined
    async fn install(&self, branch: &str, dest: &Path) -> Result<String, DepotError>;

    /// Latest version published upstream
    async fn latest(&self, branch: &str) -> Result<String, DepotError>;
}
