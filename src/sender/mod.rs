//! Outbound SMS delivery
//!
//! [`SmsSender`] is the seam the webhook handler and the follow-up wave talk
//! to; [`TextbeltSender`] is the production implementation. Sends either
//! produce a provider message id or a typed error the caller branches on.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;

const TEXTBELT_API_URL: &str = "https://textbelt.com/text";

#[derive(Debug, Error)]
pub enum SendError {
    #[error("TEXTBELT_API_KEY is not configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("provider rejected the message: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Deliver `body` to `to`, returning the provider message id.
    async fn send(&self, to: &str, body: &str) -> Result<String, SendError>;
}

/// Textbelt HTTP API client.
pub struct TextbeltSender {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    reply_webhook_url: Option<String>,
    test_mode: bool,
}

#[derive(Debug, Deserialize)]
struct TextbeltResponse {
    #[serde(default)]
    success: bool,
    #[serde(rename = "textId")]
    text_id: Option<String>,
    #[serde(rename = "quotaRemaining")]
    quota_remaining: Option<i64>,
    error: Option<String>,
}

impl TextbeltSender {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.request_timeout)
                .build()
                .unwrap_or_default(),
            api_url: TEXTBELT_API_URL.to_string(),
            api_key: config.textbelt_api_key.clone(),
            reply_webhook_url: config.textbelt_webhook_url.clone(),
            test_mode: config.test_mode,
        }
    }

    #[cfg(test)]
    fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

#[async_trait]
impl SmsSender for TextbeltSender {
    async fn send(&self, to: &str, body: &str) -> Result<String, SendError> {
        if self.test_mode {
            let message_id = format!("test_{}", uuid::Uuid::new_v4().simple());
            tracing::info!(to, body, message_id, "test mode: skipping real send");
            return Ok(message_id);
        }

        let api_key = self.api_key.as_deref().ok_or(SendError::MissingApiKey)?;

        let mut payload = vec![("phone", to), ("message", body), ("key", api_key)];
        if let Some(webhook_url) = self.reply_webhook_url.as_deref() {
            payload.push(("replyWebhookUrl", webhook_url));
        }

        let response: TextbeltResponse = self
            .client
            .post(&self.api_url)
            .form(&payload)
            .send()
            .await?
            .json()
            .await?;

        if response.success {
            let message_id = response.text_id.unwrap_or_else(|| "unknown".to_string());
            tracing::info!(
                to,
                message_id,
                quota_remaining = response.quota_remaining,
                "sent SMS"
            );
            Ok(message_id)
        } else {
            Err(SendError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(test_mode: bool, api_key: Option<&str>) -> Config {
        let mut config = Config::for_tests("unused");
        config.test_mode = test_mode;
        config.textbelt_api_key = api_key.map(str::to_string);
        config
    }

    #[tokio::test]
    async fn test_mode_returns_synthetic_id_without_network() {
        let sender = TextbeltSender::new(&test_config(true, None));
        let id = sender.send("+15551234567", "hello").await.unwrap();
        assert!(id.starts_with("test_"));
    }

    #[tokio::test]
    async fn missing_api_key_is_a_typed_error() {
        let sender = TextbeltSender::new(&test_config(false, None));
        let err = sender.send("+15551234567", "hello").await.unwrap_err();
        assert!(matches!(err, SendError::MissingApiKey));
    }

    #[tokio::test]
    async fn unreachable_provider_surfaces_request_error() {
        // Port 1 on loopback is closed; the connection fails fast.
        let sender = TextbeltSender::new(&test_config(false, Some("key")))
            .with_api_url("http://127.0.0.1:1/text");
        let err = sender.send("+15551234567", "hello").await.unwrap_err();
        assert!(matches!(err, SendError::RequestFailed(_)));
    }
}
