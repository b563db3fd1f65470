// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake script runner for tests

use super::{ScriptError, ScriptRunner};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A recorded script invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptCall {
    pub script: PathBuf,
    pub args: Vec<String>,
}

/// Records script invocations; individual scripts can be made to fail
#[derive(Clone, Debug, Default)]
pub struct FakeScriptRunner {
    calls: Arc<Mutex<Vec<ScriptCall>>>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
}

impl FakeScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make invocations of `script` fail with a non-zero exit
    pub fn fail_for(&self, script: impl Into<PathBuf>) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(script.into());
    }

    /// All invocations recorded so far, in order
    pub fn calls(&self) -> Vec<ScriptCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Invocations of a specific script
    pub fn calls_for(&self, script: &Path) -> Vec<ScriptCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.script == script)
            .collect()
    }
}

#[async_trait]
impl ScriptRunner for FakeScriptRunner {
    async fn run(&self, script: &Path, args: &[String]) -> Result<(), ScriptError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ScriptCall {
                script: script.to_path_buf(),
                args: args.to_vec(),
            });

        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(script);
        if failing {
            return Err(ScriptError::NotFound(script.to_path_buf()));
        }

        Ok(())
    }
}
