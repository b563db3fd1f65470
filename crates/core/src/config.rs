// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration model
//!
//! The on-disk YAML file is owned by the external CLI; the daemon only reads
//! it. A missing file is not an error: defaults apply and the server list is
//! empty until the operator adds entries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A game server installation to monitor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub name: String,
    pub path: PathBuf,
    pub calendar_url: String,
    /// Release branch of the shared binary trees (empty means `main`)
    #[serde(default)]
    pub branch: String,
    /// Whether to delete blueprint files on wipe
    #[serde(default)]
    pub wipe_blueprints: bool,
    /// Whether to include this server in map-prep runs before wipes
    #[serde(default)]
    pub generate_map: bool,
}

impl Server {
    /// Stable identity: the final path component
    pub fn identity(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Branch with the empty-string default normalised to `main`
    pub fn branch(&self) -> &str {
        if self.branch.is_empty() {
            "main"
        } else {
            &self.branch
        }
    }
}

/// Application configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// How far ahead to look for calendar events (hours)
    #[serde(default = "default_lookahead_hours")]
    pub lookahead_hours: u32,
    /// Minimum gap between calendar refreshes (seconds)
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    /// Pause after an event's scheduled time before executing (seconds)
    #[serde(default = "default_event_delay")]
    pub event_delay: u64,
    /// How many hours before a wipe to run map preparation
    #[serde(default = "default_map_generation_hours")]
    pub map_generation_hours: u32,
    /// Discord webhook URL for notifications (empty disables delivery)
    #[serde(default)]
    pub discord_webhook: String,
    /// User ids to mention in notifications
    #[serde(default)]
    pub discord_mention_users: Vec<String>,
    /// Role ids to mention in notifications
    #[serde(default)]
    pub discord_mention_roles: Vec<String>,
    /// Servers to monitor
    #[serde(default)]
    pub servers: Vec<Server>,
}

fn default_lookahead_hours() -> u32 {
    24
}

fn default_check_interval() -> u64 {
    30
}

fn default_event_delay() -> u64 {
    5
}

fn default_map_generation_hours() -> u32 {
    22
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lookahead_hours: default_lookahead_hours(),
            check_interval: default_check_interval(),
            event_delay: default_event_delay(),
            map_generation_hours: default_map_generation_hours(),
            discord_webhook: String::new(),
            discord_mention_users: Vec::new(),
            discord_mention_roles: Vec::new(),
            servers: Vec::new(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(path.to_path_buf(), e)),
        };

        Ok(serde_yaml::from_str(&content)?)
    }

    /// Unique normalised branches across all configured servers
    pub fn branches(&self) -> BTreeSet<String> {
        self.servers
            .iter()
            .map(|s| s.branch().to_string())
            .collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
