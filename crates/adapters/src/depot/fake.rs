// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake depot for tests
//!
//! Implements both depot traits; tests use one instance per tree.

use super::{DepotError, GameDepot, ModDepot};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Records installs and reports a configurable identity
#[derive(Clone, Debug, Default)]
pub struct FakeDepot {
    identity: Arc<Mutex<String>>,
    installs: Arc<Mutex<Vec<(String, PathBuf)>>>,
    fail_install: Arc<AtomicBool>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl FakeDepot {
    pub fn new(identity: &str) -> Self {
        Self {
            identity: Arc::new(Mutex::new(identity.to_string())),
            ..Self::default()
        }
    }

    /// Change the identity reported by installs and `latest`
    pub fn set_identity(&self, identity: &str) {
        *self.identity.lock().unwrap_or_else(|e| e.into_inner()) = identity.to_string();
    }

    /// Make subsequent installs fail
    pub fn fail_installs(&self) {
        self.fail_install.store(true, Ordering::SeqCst);
    }

    /// Block installs until the returned handle is notified
    pub fn gate_installs(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&gate));
        gate
    }

    /// `(branch, dest)` pairs installed so far
    pub fn installs(&self) -> Vec<(String, PathBuf)> {
        self.installs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn current_identity(&self) -> String {
        self.identity
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn record_install(&self, branch: &str, dest: &Path) -> Result<String, DepotError> {
        self.installs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((branch.to_string(), dest.to_path_buf()));

        let gate = self.gate.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_install.load(Ordering::SeqCst) {
            return Err(DepotError::Failed {
                tool: "fake".to_string(),
                attempts: 1,
                detail: "injected failure".to_string(),
            });
        }

        Ok(self.current_identity())
    }
}

#[async_trait]
impl GameDepot for FakeDepot {
    async fn install(&self, branch: &str, dest: &Path) -> Result<String, DepotError> {
        self.record_install(branch, dest).await
    }

    async fn latest(&self, _branch: &str) -> Result<String, DepotError> {
        Ok(self.current_identity())
    }
}

#[async_trait]
impl ModDepot for FakeDepot {
    async fn install(&self, branch: &str, dest: &Path) -> Result<String, DepotError> {
        self.record_install(branch, dest).await
    }

    async fn latest(&self, _branch: &str) -> Result<String, DepotError> {
        Ok(self.current_identity())
    }
}
