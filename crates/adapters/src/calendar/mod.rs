// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Calendar fetch adapter

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeCalendarFetcher;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch calendar: {0}")]
    Http(#[from] reqwest::Error),

    #[error("calendar not available: {0}")]
    Unavailable(String),
}

/// Adapter trait for fetching a calendar payload by URL
#[async_trait]
pub trait CalendarFetcher: Clone + Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP calendar fetcher
#[derive(Clone, Debug)]
pub struct HttpCalendarFetcher {
    client: reqwest::Client,
}

impl HttpCalendarFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpCalendarFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarFetcher for HttpCalendarFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
