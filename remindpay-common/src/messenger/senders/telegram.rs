use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::messenger::{MessengerError, SendMessage};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramSender {
    client: Client,
    send_message_url: String,
}

impl TelegramSender {
    pub fn new(bot_token: &str) -> Self {
        Self::with_api_base(bot_token, TELEGRAM_API_BASE)
    }

    pub fn with_api_base(bot_token: &str, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            send_message_url: format!("{api_base}/bot{bot_token}/sendMessage"),
        }
    }
}

#[async_trait]
impl SendMessage for TelegramSender {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), MessengerError> {
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(&self.send_message_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MessengerError::Transport(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MessengerError::Api(format!(
                "sendMessage returned {status}: {body}"
            )));
        }

        Ok(())
    }
}
