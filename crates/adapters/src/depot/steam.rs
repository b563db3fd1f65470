// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! steamcmd-backed game depot
//!
//! A single shared steamcmd install serves every branch. Branch `main` (or
//! empty) maps to the `public` beta channel.

use super::{DepotError, GameDepot};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

const INSTALL_ATTEMPTS: u32 = 3;

/// Game depot driven by the `steamcmd.sh` bootstrap
#[derive(Clone, Debug)]
pub struct SteamCmdDepot {
    app_id: String,
    steamcmd_dir: PathBuf,
    bootstrap_url: String,
    client: reqwest::Client,
}

impl SteamCmdDepot {
    pub fn new(
        app_id: impl Into<String>,
        steamcmd_dir: impl Into<PathBuf>,
        bootstrap_url: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            steamcmd_dir: steamcmd_dir.into(),
            bootstrap_url: bootstrap_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn binary(&self) -> PathBuf {
        self.steamcmd_dir.join("steamcmd.sh")
    }

    /// Download and extract steamcmd if the shared install is missing
    async fn ensure_bootstrap(&self) -> Result<(), DepotError> {
        if self.binary().exists() {
            return Ok(());
        }

        tracing::info!(dir = %self.steamcmd_dir.display(), "bootstrapping steamcmd");
        tokio::fs::create_dir_all(&self.steamcmd_dir)
            .await
            .map_err(|e| DepotError::Io(self.steamcmd_dir.clone(), e))?;

        let bytes = self
            .client
            .get(&self.bootstrap_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let tarball = self.steamcmd_dir.join("steamcmd_linux.tar.gz");
        tokio::fs::write(&tarball, &bytes)
            .await
            .map_err(|e| DepotError::Io(tarball.clone(), e))?;

        let output = Command::new("tar")
            .arg("-xzf")
            .arg(&tarball)
            .arg("-C")
            .arg(&self.steamcmd_dir)
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

        tracing::info!("steamcmd installed");
        Ok(())
    }

    fn beta_channel(branch: &str) -> &str {
        if branch.is_empty() || branch == "main" {
            "public"
        } else {
            branch
        }
    }

    fn manifest_path(&self, dest: &Path) -> PathBuf {
        dest.join("steamapps")
            .join(format!("appmanifest_{}.acf", self.app_id))
    }
}

#[async_trait]
impl GameDepot for SteamCmdDepot {
    async fn install(&self, branch: &str, dest: &Path) -> Result<String, DepotError> {
        self.ensure_bootstrap().await?;

        let beta = Self::beta_channel(branch);
        let mut last_detail = String::new();

        for attempt in 1..=INSTALL_ATTEMPTS {
            tracing::info!(branch, attempt, max = INSTALL_ATTEMPTS, "running steamcmd app_update");

            let output = Command::new(self.binary())
                .arg("+force_install_dir")
                .arg(dest)
                .args(["+login", "anonymous", "+app_update", &self.app_id])
                .args(["-beta", beta])
                .args(["validate", "+quit"])
                .env("TERM", "xterm")
                .output()
                .await
                .map_err(|e| DepotError::Spawn {
                    tool: "steamcmd".to_string(),
                    source: e,
                })?;

            if output.status.success() {
                let build_id = match tokio::fs::read_to_string(self.manifest_path(dest)).await {
                    Ok(manifest) => parse_manifest_build_id(&manifest).unwrap_or_default(),
                    Err(e) => {
                        tracing::warn!(error = %e, "could not read app manifest");
                        String::new()
                    }
                };
                return Ok(build_id);
            }

            last_detail = String::from_utf8_lossy(&output.stdout)
                .lines()
                .last()
                .unwrap_or_default()
                .to_string();
            tracing::warn!(branch, attempt, detail = %last_detail, "steamcmd attempt failed");
        }

        Err(DepotError::Failed {
            tool: "steamcmd".to_string(),
            attempts: INSTALL_ATTEMPTS,
            detail: last_detail,
        })
    }

    async fn latest(&self, branch: &str) -> Result<String, DepotError> {
        self.ensure_bootstrap().await?;

        let output = Command::new(self.binary())
            .args([
                "+login",
                "anonymous",
                "+app_info_update",
                "1",
                "+app_info_print",
                &self.app_id,
                "+quit",
            ])
            .output()
            .await
            .map_err(|e| DepotError::Spawn {
                tool: "steamcmd".to_string(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(DepotError::Failed {
                tool: "steamcmd".to_string(),
                attempts: 1,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let info = String::from_utf8_lossy(&output.stdout);
        parse_app_info_build_id(&info, Self::beta_channel(branch))
            .ok_or_else(|| DepotError::NoIdentity(branch.to_string()))
    }
}

/// Extract `"buildid" "12345678"` from an appmanifest acf file
pub fn parse_manifest_build_id(manifest: &str) -> Option<String> {
    manifest
        .lines()
        .find(|line| line.contains("\"buildid\""))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|field| field.trim_matches('"').to_string())
        .filter(|id| !id.is_empty())
}

/// Extract the build id for one branch from `app_info_print` output
///
/// The output nests `"branches" { "<name>" { "buildid" "..." } }`; the walk
/// tracks the enclosing section by brace depth relative to the branch name.
pub fn parse_app_info_build_id(output: &str, branch: &str) -> Option<String> {
    let branch_key = format!("\"{}\"", branch);
    let mut in_branches = false;
    let mut in_target = false;
    let mut depth = 0i32;

    for line in output.lines() {
        let trimmed = line.trim();

        if !in_branches {
            if trimmed.starts_with("\"branches\"") {
                in_branches = true;
            }
            continue;
        }

        if !in_target {
            if trimmed.starts_with(&branch_key) {
                in_target = true;
                depth = 0;
            }
            continue;
        }

        match trimmed {
            "{" => depth += 1,
            "}" => {
                depth -= 1;
                if depth <= 0 {
                    in_target = false;
                }
            }
            _ => {
                if trimmed.starts_with("\"buildid\"") {
                    return trimmed
                        .split_whitespace()
                        .nth(1)
                        .map(|field| field.trim_matches('"').to_string());
                }
            }
        }
    }

    None
}

#[cfg(test)]
#[path = "steam_tests.rs"]
mod tests;
