//! Long-poll loop feeding updates to the handler

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use tracing::{debug, error, info, warn};

use super::handler::{BotHandler, Reply};
use super::menu;
use crate::telegram::{BotApi, CallbackQuery, Message, TelegramError, Update};

/// Initial backoff after a failed poll
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Backoff never grows past this
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// How long to wait before the next poll after `err`
///
/// Telegram's own `retry_after` wins over the local backoff.
pub fn poll_delay(backoff: Duration, err: &TelegramError) -> Duration {
    err.retry_after().unwrap_or(backoff)
}

/// Backoff to use after another consecutive failure
pub fn next_backoff(backoff: Duration) -> Duration {
    (backoff * 2).min(MAX_BACKOFF)
}

/// Drives the bot: polls Telegram and dispatches each update in order
pub struct BotRunner {
    api: Arc<dyn BotApi>,
    handler: BotHandler,
    long_poll_secs: u64,
}

impl BotRunner {
    pub fn new(api: Arc<dyn BotApi>, handler: BotHandler, long_poll_secs: u64) -> Self {
        Self {
            api,
            handler,
            long_poll_secs,
        }
    }

    /// Poll forever
    ///
    /// Poll failures back off and retry; a failing update is logged and skipped
    /// so one bad message can't wedge the queue.
    pub async fn run(self) -> Result<()> {
        info!(long_poll_secs = self.long_poll_secs, "BotRunner started");
        let mut offset: Option<i64> = None;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match self.poll_once(offset).await {
                Ok(next) => {
                    offset = next;
                    backoff = INITIAL_BACKOFF;
                }
                Err(e) => {
                    let delay = poll_delay(backoff, &e);
                    if e.is_retryable() {
                        warn!(error = %e, ?delay, "getUpdates failed, backing off");
                    } else {
                        error!(error = %e, ?delay, "getUpdates failed");
                    }
                    tokio::time::sleep(delay).await;
                    backoff = next_backoff(backoff);
                }
            }
        }
    }

    /// Fetch one batch and dispatch it in order
    ///
    /// Returns the offset for the next poll: one past the highest update id seen.
    pub async fn poll_once(&self, offset: Option<i64>) -> Result<Option<i64>, TelegramError> {
        let updates = self.api.get_updates(offset, self.long_poll_secs).await?;
        debug!(?offset, count = updates.len(), "poll_once: got updates");

        let mut next = offset;
        for update in updates {
            next = next.max(Some(update.update_id + 1));
            self.dispatch(update).await;
        }
        Ok(next)
    }

    async fn dispatch(&self, update: Update) {
        debug!(update_id = update.update_id, "dispatch: called");
        if let Some(callback) = update.callback_query {
            self.on_callback(callback).await;
        } else if let Some(message) = update.message {
            self.on_message(message).await;
        } else {
            debug!(update_id = update.update_id, "dispatch: update without message or callback");
        }
    }

    async fn on_message(&self, message: Message) {
        let Some(text) = message.text.as_deref() else {
            debug!(message_id = message.message_id, "on_message: non-text message ignored");
            return;
        };
        let chat_id = message.chat.id.to_string();

        let reply = match self.handler.handle_text(&chat_id, text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(%chat_id, error = %e, "Failed to handle message");
                Some(Reply::Text {
                    text: menu::INTERNAL_ERROR.to_string(),
                    markup: Some(menu::main_keyboard()),
                })
            }
        };

        if let Some(reply) = reply {
            self.deliver(&chat_id, None, reply).await;
        }
    }

    async fn on_callback(&self, callback: CallbackQuery) {
        if let Err(e) = self.api.answer_callback_query(&callback.id).await {
            warn!(callback_id = %callback.id, error = %e, "Failed to answer callback query");
        }

        let Some(message) = callback.message else {
            debug!(callback_id = %callback.id, "on_callback: no originating message");
            return;
        };
        let chat_id = message.chat.id.to_string();
        let data = callback.data.unwrap_or_default();

        let reply = match self.handler.handle_callback(&chat_id, &data).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(%chat_id, %data, error = %e, "Failed to handle callback");
                Some(Reply::Edit {
                    text: menu::INTERNAL_ERROR.to_string(),
                    parse_mode: None,
                })
            }
        };

        if let Some(reply) = reply {
            self.deliver(&chat_id, Some(message.message_id), reply).await;
        }
    }

    /// Send or edit; an edit without a target message is sent as a new message
    async fn deliver(&self, chat_id: &str, message_id: Option<i64>, reply: Reply) {
        let result = match (reply, message_id) {
            (Reply::Edit { text, parse_mode }, Some(message_id)) => {
                self.api
                    .edit_message_text(chat_id, message_id, &text, parse_mode)
                    .await
            }
            (Reply::Edit { text, parse_mode }, None) => self.api.send_message(chat_id, &text, None, parse_mode).await,
            (Reply::Text { text, markup }, _) => self.api.send_message(chat_id, &text, markup.as_ref(), None).await,
        };

        if let Err(e) = result {
            warn!(%chat_id, error = %e, "Failed to deliver reply");
        }
    }
}
