//! Watch registry messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use super::document::{ChatSession, ChatUpdate, WatchEntry};
use crate::domain::Phase;

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from registry operations
pub type RegistryResponse<T> = Result<T, RegistryError>;

/// Commands sent to the WatchRegistry actor
#[derive(Debug)]
pub enum RegistryCommand {
    // Watch operations
    Subscribe {
        project_id: String,
        chat_id: String,
        reply: oneshot::Sender<RegistryResponse<bool>>,
    },
    GetSubscribers {
        project_id: String,
        reply: oneshot::Sender<RegistryResponse<Vec<String>>>,
    },
    GetLastNotified {
        project_id: String,
        reply: oneshot::Sender<RegistryResponse<Option<Phase>>>,
    },
    SetLastNotified {
        project_id: String,
        phase: Phase,
        reply: oneshot::Sender<RegistryResponse<()>>,
    },
    ListWatched {
        reply: oneshot::Sender<RegistryResponse<Vec<WatchEntry>>>,
    },

    // Chat session operations
    GetChat {
        chat_id: String,
        reply: oneshot::Sender<RegistryResponse<ChatSession>>,
    },
    UpdateChat {
        chat_id: String,
        updates: Vec<ChatUpdate>,
        reply: oneshot::Sender<RegistryResponse<ChatSession>>,
    },

    // Shutdown
    Shutdown,
}
