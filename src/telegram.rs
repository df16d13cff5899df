//! Message delivery via the Telegram Bot API
//! (`POST /bot<token>/sendMessage`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};

/// Delivery target for formatted status messages.
#[async_trait]
pub trait Notifier {
    /// Deliver `text` to the configured chat exactly once.
    async fn send_message(&self, text: &str) -> Result<()>;
}

pub struct TelegramClient {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(http: reqwest::Client, bot_token: String, chat_id: String) -> Self {
        Self {
            http,
            bot_token,
            chat_id,
        }
    }

    fn send_url(&self) -> String {
        format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token)
    }

    fn send_error(&self, reason: String) -> Error {
        Error::Send {
            chat_id: self.chat_id.clone(),
            reason,
        }
    }
}

/// Envelope the Bot API wraps every reply in.
#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send_message(&self, text: &str) -> Result<()> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
        });

        let response = self
            .http
            .post(self.send_url())
            .json(&payload)
            .send()
            .await
            .map_err(|err| self.send_error(err.to_string()))?;

        let status = response.status();
        let body: SendMessageResponse = response
            .json()
            .await
            .map_err(|err| self.send_error(err.to_string()))?;

        if !status.is_success() || !body.ok {
            let reason = body.description.unwrap_or_else(|| format!("HTTP {status}"));
            return Err(self.send_error(reason));
        }

        tracing::debug!("Message delivered to Telegram");
        Ok(())
    }
}
