//! Failure notification.
//!
//! The sync loop reports transform failures and failed runs through a
//! [`Notifier`]. Delivery problems are the caller's to log; they never
//! abort a run.

use crate::config::NotifyConfig;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Job name carried in every notification.
pub const JOB_NAME: &str = "flight-sync";

/// Trait for failure notification channels.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Emits the message as an `error` event and nothing else.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        error!("{} failed: {}", JOB_NAME, message);
        Ok(())
    }
}

/// Payload posted to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub job: String,
    pub message: String,
    pub sent_at: NaiveDateTime,
}

impl NotificationRequest {
    pub fn new(message: &str) -> Self {
        Self {
            job: JOB_NAME.to_string(),
            message: message.to_string(),
            sent_at: Local::now().naive_local(),
        }
    }
}

/// POSTs failures as JSON to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Notify(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let request = NotificationRequest::new(message);
        debug!("Sending failure notification to {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SyncError::Notify(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read body>".to_string());
            return Err(SyncError::Notify(format!(
                "webhook returned status {}: {}",
                status, body
            )));
        }

        // Mirror the message locally so failures show up in the job log too.
        error!("{} failed: {}", JOB_NAME, message);
        Ok(())
    }
}

/// Pick the notifier the configuration asks for.
pub fn from_config(config: &NotifyConfig) -> Result<Arc<dyn Notifier>> {
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(LogNotifier)),
    }
}
