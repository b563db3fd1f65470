// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discord webhook notification sink

use super::{Notification, NotifyAdapter, NotifyError, NotifyLevel};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const COLOR_SUCCESS: u32 = 0x00ff00;
const COLOR_INFO: u32 = 0x0099ff;
const COLOR_WARNING: u32 = 0xff9900;
const COLOR_ERROR: u32 = 0xff0000;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct WebhookPayload {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    timestamp: String,
    fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

/// Webhook-backed notifier; an empty URL disables delivery
#[derive(Clone, Debug)]
pub struct DiscordNotifier {
    webhook_url: String,
    mention_users: Vec<String>,
    mention_roles: Vec<String>,
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            mention_users: Vec::new(),
            mention_roles: Vec::new(),
            client: reqwest::Client::builder()
                .timeout(DELIVERY_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_mentions(mut self, users: Vec<String>, roles: Vec<String>) -> Self {
        self.mention_users = users;
        self.mention_roles = roles;
        self
    }

    fn build_payload(&self, notification: &Notification) -> WebhookPayload {
        let color = match notification.level {
            NotifyLevel::Info => COLOR_INFO,
            NotifyLevel::Success => COLOR_SUCCESS,
            NotifyLevel::Warning => COLOR_WARNING,
            NotifyLevel::Error => COLOR_ERROR,
        };

        let mut description = notification.description.clone();
        if let Some(mentions) = self.mention_line() {
            description = format!("{}\n\n{}", mentions, description);
        }

        WebhookPayload {
            embeds: vec![Embed {
                title: notification.title.clone(),
                description,
                color,
                timestamp: chrono::Utc::now().to_rfc3339(),
                fields: vec![EmbedField {
                    name: "Hostname".to_string(),
                    value: host_name(),
                    inline: true,
                }],
            }],
        }
    }

    fn mention_line(&self) -> Option<String> {
        if self.mention_users.is_empty() && self.mention_roles.is_empty() {
            return None;
        }

        let mentions: Vec<String> = self
            .mention_roles
            .iter()
            .map(|id| format!("<@&{}>", id))
            .chain(self.mention_users.iter().map(|id| format!("<@{}>", id)))
            .collect();

        Some(format!("cc {}", mentions.join(" ")))
    }
}

#[async_trait]
impl NotifyAdapter for DiscordNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.webhook_url.is_empty() {
            return Ok(());
        }

        let payload = self.build_payload(&notification);
        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

fn host_name() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
#[path = "discord_tests.rs"]
mod tests;
