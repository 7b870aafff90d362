//! Telegram notification backend.
//!
//! Sends messages through the Telegram Bot API `sendMessage` endpoint.

use async_trait::async_trait;
use serde_json::json;

use super::{Notifier, NotifyError};

/// Notifier that posts messages to a Telegram chat.
pub struct TelegramNotifier {
    client: reqwest::Client,
    url: String,
    chat_id: i64,
}

impl TelegramNotifier {
    /// Create a notifier for the given bot token and chat.
    pub fn new(bot_token: &str, chat_id: i64) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("https://api.telegram.org/bot{}/sendMessage", bot_token),
            chat_id,
        }
    }

    /// Override the API base URL (for tests).
    #[cfg(test)]
    fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": message,
            }))
            .send()
            .await
            .map_err(|e| NotifyError::Send(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{}: {}", status, body)));
        }

        Ok(())
    }
}
