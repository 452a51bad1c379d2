use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Delivers one text message to the configured destination.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Telegram `sendMessage` sink. When the token or chat id is missing the
/// sink degrades to a logging no-op instead of failing the run.
pub struct TelegramSink {
    client: Client,
    token: String,
    chat_id: String,
    send_timeout: Duration,
}

impl TelegramSink {
    pub fn new(token: String, chat_id: String, send_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            token,
            chat_id,
            send_timeout,
        }
    }

    fn configured(&self) -> bool {
        !self.token.is_empty() && !self.chat_id.is_empty()
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send(&self, text: &str) -> Result<()> {
        if !self.configured() {
            tracing::warn!("telegram credentials missing, dropping message");
            return Ok(());
        }

        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_BASE, self.token);
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });

        let send = self.client.post(&url).json(&body).send();
        let resp = tokio::time::timeout(self.send_timeout, send)
            .await
            .context("telegram send timed out")?
            .context("telegram request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("telegram sendMessage failed ({}): {}", status, body);
        }

        let preview: String = text.chars().take(20).collect();
        tracing::info!(preview = %preview, "telegram message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credentials_degrade_to_noop() {
        let sink = TelegramSink::new(String::new(), String::new(), Duration::from_secs(20));
        assert!(sink.send("hello").await.is_ok());

        let sink = TelegramSink::new("token".to_string(), String::new(), Duration::from_secs(20));
        assert!(sink.send("hello").await.is_ok());
    }
}
