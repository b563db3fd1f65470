// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-branch readers/writer locks for the shared binary trees
//!
//! Installs take the write side; sync workers take the read side for the
//! duration of their copy. Locks are created on first use and never deleted.
//! Fairness is whatever tokio's RwLock provides; writers are rare and
//! readers are short.

use crate::trees::TreeKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Normalise the empty branch to `main`
pub fn normalise(branch: &str) -> &str {
    if branch.is_empty() {
        "main"
    } else {
        branch
    }
}

/// Lazy registry of `(tree, branch)` locks
///
/// The outer mutex only guards map growth; the per-branch RwLock is the
/// primary synchroniser.
#[derive(Debug, Default)]
pub struct BranchLocks {
    locks: Mutex<HashMap<(TreeKind, String), Arc<RwLock<()>>>>,
}

impl BranchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, tree: TreeKind, branch: &str) -> Arc<RwLock<()>> {
        let key = (tree, normalise(branch).to_string());
        Arc::clone(
            self.locks
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .entry(key)
                .or_default(),
        )
    }

    /// Acquire the read side; the guard releases on drop
    pub async fn read(&self, tree: TreeKind, branch: &str) -> OwnedRwLockReadGuard<()> {
        let guard = self.lock_for(tree, branch).read_owned().await;
        tracing::debug!(%tree, branch = normalise(branch), "acquired read lock");
        guard
    }

    /// Acquire the write side; the guard releases on drop
    pub async fn write(&self, tree: TreeKind, branch: &str) -> OwnedRwLockWriteGuard<()> {
        let guard = self.lock_for(tree, branch).write_owned().await;
        tracing::debug!(%tree, branch = normalise(branch), "acquired write lock");
        guard
    }
}

#[cfg(test)]
#[path = "branch_lock_tests.rs"]
mod tests;
