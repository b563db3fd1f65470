// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP release-feed mod depot
//!
//! The mod framework publishes a JSON changelog feed (newest first) and
//! per-channel release tarballs. An unknown branch falls back to the main
//! channel tarball.

use super::{DepotError, ModDepot};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

/// One entry of the release feed
#[derive(Clone, Debug, Deserialize)]
pub struct ModRelease {
    #[serde(rename = "Date", default)]
    pub date: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "CommitUrl", default)]
    pub commit_url: String,
}

/// Mod depot backed by release tarballs and a JSON feed
#[derive(Clone, Debug)]
pub struct ReleaseModDepot {
    feed_url: String,
    main_url: String,
    staging_url: String,
    /// Optional extra extension DLL, fetched best-effort after install
    extension_url: Option<String>,
    client: reqwest::Client,
}

impl ReleaseModDepot {
    pub fn new(
        feed_url: impl Into<String>,
        main_url: impl Into<String>,
        staging_url: impl Into<String>,
    ) -> Self {
        Self {
            feed_url: feed_url.into(),
            main_url: main_url.into(),
            staging_url: staging_url.into(),
            extension_url: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_extension(mut self, url: impl Into<String>) -> Self {
        self.extension_url = Some(url.into());
        self
    }

    fn download_url(&self, branch: &str) -> &str {
        match branch {
            "" | "main" => &self.main_url,
            "staging" => &self.staging_url,
            other => {
                tracing::warn!(branch = other, "unknown mod branch, using main release");
                &self.main_url
            }
        }
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), DepotError> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| DepotError::Io(dest.to_path_buf(), e))
    }
}

#[async_trait]
impl ModDepot for ReleaseModDepot {
    async fn install(&self, branch: &str, dest: &Path) -> Result<String, DepotError> {
        tokio::fs::create_dir_all(dest)
            .await
            .map_err(|e| DepotError::Io(dest.to_path_buf(), e))?;

        let tarball = dest.join("release.tar.gz");
        let url = self.download_url(branch);
        tracing::info!(branch, url, "downloading mod release");
        self.download(url, &tarball).await?;

        let output = Command::new("tar")
            .arg("-xzf")
            .arg(&tarball)
            .arg("-C")
            .arg(dest)
            .output()
            .await
            .map_err(|e| DepotError::Spawn {
                tool: "tar".to_string(),
                source: e,
            })?;

        let _ = tokio::fs::remove_file(&tarball).await;

        if !output.status.success() {
            return Err(DepotError::Failed {
                tool: "tar".to_string(),
                attempts: 1,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if let Some(extension_url) = &self.extension_url {
            let extension_dir = dest.join("carbon").join("extensions");
            let target = extension_dir.join(extension_file_name(extension_url));
            let fetched = match tokio::fs::create_dir_all(&extension_dir).await {
                Ok(()) => self.download(extension_url, &target).await,
                Err(e) => Err(DepotError::Io(extension_dir, e)),
            };
            if let Err(e) = fetched {
                tracing::warn!(error = %e, "failed to fetch mod extension, continuing");
            }
        }

        // The feed, not the tarball, carries the version
        match self.latest(branch).await {
            Ok(version) => Ok(version),
            Err(e) => {
                tracing::warn!(error = %e, "could not determine mod version");
                Ok(String::new())
            }
        }
    }

    async fn latest(&self, _branch: &str) -> Result<String, DepotError> {
        let releases: Vec<ModRelease> = self
            .client
            .get(&self.feed_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        releases
            .first()
            .map(|release| release.version.clone())
            .ok_or_else(|| DepotError::NoIdentity("empty release feed".to_string()))
    }
}

fn extension_file_name(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("extension.dll")
        .to_string()
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
