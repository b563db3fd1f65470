// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External script invocation
//!
//! The lifecycle scripts (stop, start, pre-start hook, map-prep) are operator
//! supplied; the daemon only invokes them with the selected server paths as
//! arguments and merges their output into its own log.

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeScriptRunner, ScriptCall};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script not found at {0}")]
    NotFound(PathBuf),

    #[error("failed to spawn {0}: {1}")]
    Spawn(PathBuf, #[source] std::io::Error),

    #[error("{script} exited with {status}")]
    Failed {
        script: PathBuf,
        status: std::process::ExitStatus,
    },
}

/// Adapter trait for running lifecycle scripts
#[async_trait]
pub trait ScriptRunner: Clone + Send + Sync + 'static {
    /// Run a script with the given arguments; success means exit status 0
    async fn run(&self, script: &Path, args: &[String]) -> Result<(), ScriptError>;
}

/// Runs scripts as child processes, logging their merged output
#[derive(Clone, Debug, Default)]
pub struct ShellScriptRunner;

impl ShellScriptRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScriptRunner for ShellScriptRunner {
    async fn run(&self, script: &Path, args: &[String]) -> Result<(), ScriptError> {
        if !script.exists() {
            return Err(ScriptError::NotFound(script.to_path_buf()));
        }

        let output = Command::new(script)
            .args(args)
            .output()
            .await
            .map_err(|e| ScriptError::Spawn(script.to_path_buf(), e))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::info!(script = %script.display(), "{}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            tracing::warn!(script = %script.display(), "{}", line);
        }

        if !output.status.success() {
            return Err(ScriptError::Failed {
                script: script.to_path_buf(),
                status: output.status,
            });
        }

        Ok(())
    }
}
