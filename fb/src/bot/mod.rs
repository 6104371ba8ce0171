//! Telegram conversation front-end

mod handler;
pub mod menu;
mod runner;

pub use handler::{BotHandler, Reply};
pub use runner::{BotRunner, INITIAL_BACKOFF, MAX_BACKOFF, next_backoff, poll_delay};
