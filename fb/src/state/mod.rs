//! Watch registry with actor pattern
//!
//! WatchRegistry owns the RegistryStore and processes messages via channels,
//! giving the bot and the notifier serialized access to the persisted document.

mod document;
mod manager;
mod messages;
mod store;

pub use document::{ChatSession, ChatUpdate, WatchEntry, WatchState};
pub use manager::WatchRegistry;
pub use messages::{RegistryCommand, RegistryError, RegistryResponse};
pub use store::{FileBackend, MemoryBackend, RegistryStore, StorageBackend};
