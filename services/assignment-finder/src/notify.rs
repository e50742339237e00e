//! Operator notification sinks.
//!
//! Delivery is best-effort. Callers log a failed [`Notifier::notify`] and
//! carry on; the allocation outcome never depends on it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use slotpool::{Notification, Severity};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::secrets::BearerToken;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("notification rejected: {0}")]
    Rejected(String),

    #[error("invalid bearer token")]
    InvalidToken,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

// =============================================================================
// Slack
// =============================================================================

/// Slack `chat.postMessage` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackConfig {
    pub api_url: String,
    pub channel: String,
    pub username: String,
    pub icon_emoji: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_url: "https://slack.com/api/chat.postMessage".to_string(),
            channel: "C06FC5HDFT5".to_string(),
            username: "Testnet-AO-DevOps".to_string(),
            icon_emoji: ":diamond_shape_with_a_dot_inside:".to_string(),
        }
    }
}

/// Attachment color for a severity.
pub fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Ok => "#36a64f",
        Severity::Warn => "#FFA500",
        Severity::Error => "#ff0000",
    }
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    username: &'a str,
    icon_emoji: &'a str,
    unfurl_links: bool,
    unfurl_media: bool,
    attachments: [Attachment<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Attachment<'a> {
    color: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts notifications to a Slack channel.
pub struct SlackNotifier {
    client: reqwest::Client,
    config: SlackConfig,
    enabled: bool,
}

impl SlackNotifier {
    /// Build a notifier. An empty token yields a notifier that only logs.
    pub fn new(config: SlackConfig, token: &BearerToken) -> Result<Self, NotifyError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if !token.is_empty() {
            let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
                .map_err(|_| NotifyError::InvalidToken)?;
            bearer.set_sensitive(true);
            headers.insert(AUTHORIZATION, bearer);
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            config,
            enabled: !token.is_empty(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if !self.enabled {
            warn!(
                severity = %notification.severity,
                message = %notification.message,
                "No notifier credential; skipping Slack delivery"
            );
            return Ok(());
        }

        let payload = PostMessage {
            channel: &self.config.channel,
            username: &self.config.username,
            icon_emoji: &self.config.icon_emoji,
            unfurl_links: false,
            unfurl_media: false,
            attachments: [Attachment {
                color: severity_color(notification.severity),
                text: &notification.message,
            }],
        };

        debug!(url = %self.config.api_url, severity = %notification.severity, "Posting Slack message");
        let body = serde_json::to_vec(&payload)?;
        let response = self
            .client
            .post(&self.config.api_url)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        info!(status = %status, body = %body, "Slack response");

        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Slack reports most failures as 200 with `ok: false`.
        match serde_json::from_str::<PostMessageResponse>(&body) {
            Ok(PostMessageResponse { ok: false, error }) => Err(NotifyError::Rejected(
                error.unwrap_or_else(|| "unknown error".to_string()),
            )),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Log-only
// =============================================================================

/// Writes notifications to the log instead of a channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        match notification.severity {
            Severity::Ok => info!(severity = "ok", "{}", notification.message),
            Severity::Warn => warn!(severity = "warn", "{}", notification.message),
            Severity::Error => error!(severity = "error", "{}", notification.message),
        }
        Ok(())
    }
}
