//! Telegram error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur talking to the Bot API
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {code}: {description}")]
    ApiError { code: u16, description: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Bot token not found. Set the {0} environment variable.")]
    MissingToken(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TelegramError {
    /// Check if this error is worth retrying later
    pub fn is_retryable(&self) -> bool {
        match self {
            TelegramError::RateLimited { .. } => true,
            TelegramError::ApiError { code, .. } => *code >= 500,
            TelegramError::Network(_) => true,
            TelegramError::InvalidResponse(_) => false,
            TelegramError::MissingToken(_) => false,
            TelegramError::Json(_) => false,
        }
    }

    /// Get the retry duration if this is a rate limit error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TelegramError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
