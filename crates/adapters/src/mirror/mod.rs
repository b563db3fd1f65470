// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory mirroring
//!
//! Sync workers refresh server installations by mirroring a branch tree into
//! the server path with `rsync -a src/ dst/` semantics.

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeMirror;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("failed to spawn rsync: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("mirror of {src} failed: {detail}")]
    Failed { src: PathBuf, detail: String },
}

/// Adapter trait for mirroring one directory tree into another
#[async_trait]
pub trait Mirror: Clone + Send + Sync + 'static {
    async fn mirror(&self, src: &Path, dst: &Path) -> Result<(), MirrorError>;
}

/// rsync-backed mirror
#[derive(Clone, Debug, Default)]
pub struct RsyncMirror;

impl RsyncMirror {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mirror for RsyncMirror {
    async fn mirror(&self, src: &Path, dst: &Path) -> Result<(), MirrorError> {
        // Trailing slashes: copy contents of src into dst
        let output = Command::new("rsync")
            .arg("-a")
            .arg(format!("{}/", src.display()))
            .arg(format!("{}/", dst.display()))
            .output()
            .await
            .map_err(MirrorError::Spawn)?;

        if !output.status.success() {
            return Err(MirrorError::Failed {
                src: src.to_path_buf(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
