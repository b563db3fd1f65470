// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake calendar fetcher for tests

use super::{CalendarFetcher, FetchError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Serves canned payloads by URL; unknown URLs fail like a dead endpoint
#[derive(Clone, Debug, Default)]
pub struct FakeCalendarFetcher {
    payloads: Arc<Mutex<HashMap<String, String>>>,
    fetches: Arc<Mutex<Vec<String>>>,
}

impl FakeCalendarFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the payload served for a URL
    pub fn serve(&self, url: impl Into<String>, payload: impl Into<String>) {
        self.payloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.into(), payload.into());
    }

    /// Stop serving a URL; subsequent fetches fail
    pub fn remove(&self, url: &str) {
        self.payloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(url);
    }

    /// URLs fetched so far, in order
    pub fn fetched(&self) -> Vec<String> {
        self.fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl CalendarFetcher for FakeCalendarFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        self.payloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Unavailable(url.to_string()))
    }
}
