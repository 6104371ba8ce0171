//! Bot API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::error::TelegramError;
use super::types::{ApiResponse, Message, ParseMode, ReplyMarkup, Update};
use crate::config::TelegramConfig;

/// Longest text the Bot API accepts in one message
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Anything that can push a plain text message to a chat
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), TelegramError>;
}

/// The Bot API calls the long-poll loop needs
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Long-poll for updates after `offset`
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>, TelegramError>;

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        markup: Option<&ReplyMarkup>,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TelegramError>;

    /// Replace the text of a message the bot sent earlier
    async fn edit_message_text(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TelegramError>;

    /// Dismiss the loading indicator on an inline button
    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError>;
}

/// Thin client over the Telegram Bot HTTP API
pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    /// Create a client, reading the token from the configured environment variable
    pub fn from_config(config: &TelegramConfig) -> Result<Self, TelegramError> {
        debug!(token_env = %config.token_env, "TelegramClient::from_config: called");
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TelegramError::MissingToken(config.token_env.clone()))?;

        Self::new(&config.api_base, token, config.timeout())
    }

    pub fn new(api_base: &str, token: impl Into<String>, timeout: Duration) -> Result<Self, TelegramError> {
        debug!(%api_base, ?timeout, "TelegramClient::new: called");
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Call a Bot API method and unwrap its envelope
    async fn call<T: DeserializeOwned, B: Serialize + ?Sized>(&self, method: &str, body: &B) -> Result<T, TelegramError> {
        debug!(%method, "TelegramClient::call: called");
        let response = self.client.post(self.method_url(method)).json(body).send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&bytes).map_err(|e| {
            TelegramError::InvalidResponse(format!("{} returned HTTP {} with unparsable body: {}", method, status, e))
        })?;

        let result = envelope.into_result();
        if let Err(ref e) = result {
            debug!(%method, %status, error = %e, "TelegramClient::call: API error");
        }
        result
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>, TelegramError> {
        debug!(?offset, timeout_secs, "get_updates: called");
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        self.call("getUpdates", &body).await
    }

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        markup: Option<&ReplyMarkup>,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TelegramError> {
        debug!(%chat_id, len = text.len(), "send_message: called");
        let mut body = json!({
            "chat_id": chat_id,
            "text": truncate_text(text),
        });
        if let Some(markup) = markup {
            body["reply_markup"] = serde_json::to_value(markup)?;
        }
        if let Some(mode) = parse_mode {
            body["parse_mode"] = serde_json::to_value(mode)?;
        }
        let _: Message = self.call("sendMessage", &body).await?;
        Ok(())
    }

    async fn edit_message_text(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TelegramError> {
        debug!(%chat_id, message_id, "edit_message_text: called");
        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": truncate_text(text),
        });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = serde_json::to_value(mode)?;
        }
        // result is the edited Message, or `true` for inline messages
        let _: serde_json::Value = self.call("editMessageText", &body).await?;
        Ok(())
    }

    async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        debug!(%callback_query_id, "answer_callback_query: called");
        let body = json!({ "callback_query_id": callback_query_id });
        let _: bool = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), TelegramError> {
        self.send_message(chat_id, text, None, None).await
    }
}

/// Cut text to the message limit on a char boundary
pub fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let client = TelegramClient::new("https://api.telegram.org/", "123:abc", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short"), "short");

        let long: String = "م".repeat(MAX_MESSAGE_CHARS + 10);
        let cut = truncate_text(&long);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_CHARS);

        let exact: String = "a".repeat(MAX_MESSAGE_CHARS);
        assert_eq!(truncate_text(&exact), exact);
    }

    #[test]
    fn test_from_config_missing_token() {
        let config = TelegramConfig {
            token_env: "FACTORYBOT_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
            ..TelegramConfig::default()
        };
        match TelegramClient::from_config(&config) {
            Err(TelegramError::MissingToken(var)) => assert_eq!(var, "FACTORYBOT_TEST_TOKEN_THAT_IS_NEVER_SET"),
            Err(e) => panic!("Expected MissingToken, got {}", e),
            Ok(_) => panic!("Expected MissingToken, got a client"),
        }
    }

    #[tokio::test]
    async fn test_send_text_returns_transport_error() {
        // nothing listens on port 1
        let client = TelegramClient::new("http://127.0.0.1:1", "123:abc", Duration::from_secs(2)).unwrap();
        let err = client.send_text("1", "hello").await.unwrap_err();
        assert!(matches!(err, TelegramError::Network(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_recording_sender() {
        let sender = mock::RecordingSender::new();
        sender.fail_for("2");

        sender.send_text("1", "hello").await.unwrap();
        assert!(sender.send_text("2", "hello").await.is_err());

        assert_eq!(sender.sent_to("1"), vec!["hello"]);
        assert!(sender.sent_to("2").is_empty());
    }
}
