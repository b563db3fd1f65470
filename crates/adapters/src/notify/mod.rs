// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification sink
//!
//! Every subsystem receives a `NotifyAdapter` as a dependency; delivery is
//! best-effort and failures never propagate past `emit`.

mod discord;
#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use discord::DiscordNotifier;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifyAdapter;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook delivery failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Notification severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A notification produced by the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotifyLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn new(level: NotifyLevel, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotifyLevel::Info, title, description)
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotifyLevel::Success, title, description)
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotifyLevel::Warning, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotifyLevel::Error, title, description)
    }
}

/// Adapter trait for notification delivery
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    /// Send a notification
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError>;

    /// Send a notification, logging delivery failure instead of returning it
    async fn emit(&self, notification: Notification) {
        let title = notification.title.clone();
        if let Err(e) = self.notify(notification).await {
            tracing::warn!(title = %title, error = %e, "failed to deliver notification");
        }
    }
}
