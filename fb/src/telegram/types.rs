//! Bot API wire types
//!
//! Only the fields the bot reads or sends are modelled; unknown fields are ignored.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::TelegramError;

/// Every Bot API response is wrapped in this envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<u16>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Unwrap the envelope into the result or a typed error
    pub fn into_result(self) -> Result<T, TelegramError> {
        if self.ok {
            return self
                .result
                .ok_or_else(|| TelegramError::InvalidResponse("ok response without result".to_string()));
        }

        let code = self.error_code.unwrap_or(0);
        let retry_after = self.parameters.and_then(|p| p.retry_after);
        match (code, retry_after) {
            (429, retry_after) => Err(TelegramError::RateLimited {
                retry_after: std::time::Duration::from_secs(retry_after.unwrap_or(5)),
            }),
            _ => Err(TelegramError::ApiError {
                code,
                description: self.description.unwrap_or_else(|| "unknown error".to_string()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Text formatting mode for outgoing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
    #[serde(rename = "HTML")]
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

/// Keyboard attached to an outgoing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
    },
    Inline {
        inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
    },
}

impl ReplyMarkup {
    /// Persistent reply keyboard from rows of button labels
    pub fn keyboard(rows: &[&[&str]]) -> Self {
        Self::Keyboard {
            keyboard: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|text| KeyboardButton { text: text.to_string() })
                        .collect()
                })
                .collect(),
            resize_keyboard: true,
        }
    }

    /// Inline keyboard with one button per row
    pub fn inline_column(buttons: impl IntoIterator<Item = (String, String)>) -> Self {
        Self::Inline {
            inline_keyboard: buttons
                .into_iter()
                .map(|(text, callback_data)| vec![InlineKeyboardButton { text, callback_data }])
                .collect(),
        }
    }
}
