//! Operator notifications.
//!
//! Delivery is fire-and-forget: a failed notification is logged and never
//! changes the outcome of a run.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::NotificationConfig;
use crate::types::error::S3BackupError;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str);
}

/// Build the notifier for the configuration: Slack when a webhook URL is
/// given, local log otherwise.
pub fn create_notifier(config: &NotificationConfig) -> Result<Box<dyn Notifier>> {
    match config.slack_webhook_url {
        Some(ref webhook_url) => Ok(Box::new(SlackNotifier::new(webhook_url, config)?)),
        None => Ok(Box::new(LogNotifier)),
    }
}

/// Writes notifications to the local log only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) {
        info!(notification = text, "Notification (no webhook configured).");
    }
}

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<&'a str>,
}

/// Posts notifications to a Slack incoming webhook.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
    channel: Option<String>,
    username: Option<String>,
    icon_emoji: Option<String>,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str, config: &NotificationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_milliseconds))
            .build()
            .context("Failed to build HTTP client for Slack notifications.")?;

        Ok(SlackNotifier {
            client,
            webhook_url: webhook_url.to_string(),
            channel: config.slack_channel.clone(),
            username: config.slack_username.clone(),
            icon_emoji: config.slack_icon_emoji.clone(),
        })
    }

    async fn post_message(&self, text: &str) -> Result<()> {
        let message = SlackMessage {
            text,
            channel: self.channel.as_deref(),
            username: self.username.as_deref(),
            icon_emoji: self.icon_emoji.as_deref(),
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await
            .map_err(|e| anyhow!(S3BackupError::Notification(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(S3BackupError::Notification(format!(
                "webhook returned HTTP {status}: {body}"
            ))));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, text: &str) {
        if let Err(e) = self.post_message(text).await {
            warn!(
                error = %e,
                notification = text,
                "Failed to send Slack notification."
            );
        }
    }
}
