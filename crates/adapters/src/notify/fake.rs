// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification adapter for tests

use super::{Notification, NotifyAdapter, NotifyError, NotifyLevel};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Records every notification instead of delivering it
#[derive(Clone, Debug, Default)]
pub struct FakeNotifyAdapter {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications recorded so far
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Titles of recorded notifications, in order
    pub fn titles(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.title).collect()
    }

    /// Recorded notifications at a given level
    pub fn at_level(&self, level: NotifyLevel) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|n| n.level == level)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
        Ok(())
    }
}
