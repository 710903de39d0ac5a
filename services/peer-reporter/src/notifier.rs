//! Delivery channel for rendered reports

use crate::config::TelegramConfig;
use crate::error::{ReporterError, ReporterResult};
use crate::types::SubscriberId;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const SEND_TIMEOUT_SECS: u64 = 15;

/// Sends formatted text to one subscriber
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subscriber: &SubscriberId, text: &str) -> ReporterResult<()>;
}

/// Telegram Bot API notifier
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    send_url: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: &str) -> ReporterResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            send_url: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token),
        })
    }

    /// `None` when no bot token is configured
    pub fn from_config(config: &TelegramConfig) -> ReporterResult<Option<Self>> {
        match config.token.as_deref() {
            Some(token) if !token.is_empty() => Self::new(&config.api_base, token).map(Some),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, subscriber: &SubscriberId, text: &str) -> ReporterResult<()> {
        let failed = |reason: String| ReporterError::DeliveryFailed {
            subscriber: subscriber.to_string(),
            reason,
        };

        let body = SendMessage {
            chat_id: subscriber.as_str(),
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(&self.send_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| failed(e.without_url().to_string()))?;

        let status = response.status();
        let reply: Option<ApiReply> = response.json().await.ok();

        match reply {
            Some(ApiReply { ok: true, .. }) if status.is_success() => {
                debug!("Delivered report to {}", subscriber);
                Ok(())
            }
            Some(ApiReply { description, .. }) => Err(failed(format!(
                "status {}: {}",
                status,
                description.unwrap_or_else(|| "no description".to_string())
            ))),
            None => Err(failed(format!("status {status}"))),
        }
    }
}

/// Writes reports to the log instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subscriber: &SubscriberId, text: &str) -> ReporterResult<()> {
        info!("Report for {}:\n{}", subscriber, text);
        Ok(())
    }
}
