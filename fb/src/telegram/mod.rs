//! Telegram Bot API access

mod client;
mod error;
mod types;

pub use client::{BotApi, MAX_MESSAGE_CHARS, MessageSender, TelegramClient, truncate_text};
pub use error::TelegramError;
pub use types::{
    ApiResponse, CallbackQuery, Chat, InlineKeyboardButton, KeyboardButton, Message, ParseMode, ReplyMarkup,
    ResponseParameters, Update,
};

#[cfg(test)]
pub use client::mock;
