// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake mirror for tests

use super::{Mirror, MirrorError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Records mirror calls; specific sources can be made to fail
#[derive(Clone, Debug, Default)]
pub struct FakeMirror {
    calls: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
}

impl FakeMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make mirrors from `src` fail
    pub fn fail_for(&self, src: impl Into<PathBuf>) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(src.into());
    }

    /// All `(src, dst)` pairs mirrored so far, in order
    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Mirror for FakeMirror {
    async fn mirror(&self, src: &Path, dst: &Path) -> Result<(), MirrorError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((src.to_path_buf(), dst.to_path_buf()));

        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(src);
        if failing {
            return Err(MirrorError::Failed {
                src: src.to_path_buf(),
                detail: "injected failure".to_string(),
            });
        }

        Ok(())
    }
}
