//! factorybot - Telegram front-end for the software factory
//!
//! Operators create projects, trigger builds and check progress from a chat.
//! A background notifier tells subscribed chats when a build passes or fails.
//!
//! # Core Concepts
//!
//! - **Stateless Estimation**: Progress is rebuilt from marker files on every call
//! - **Single Writer**: One actor owns the registry document, so concurrent
//!   handlers and the notifier never lose each other's updates
//! - **Edge-Triggered Notifications**: One message per terminal phase per project
//!
//! # Modules
//!
//! - [`domain`] - Build phase and project directory layout
//! - [`progress`] - Progress estimation and rendering
//! - [`state`] - Watch registry actor and its storage
//! - [`watcher`] - Background notifier
//! - [`telegram`] - Bot API client
//! - [`dashboard`] - Build run trigger
//! - [`bot`] - Conversation handling and the long-poll loop
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod bot;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod progress;
pub mod state;
pub mod telegram;
pub mod watcher;

// Re-export commonly used types
pub use bot::{BotHandler, BotRunner, Reply};
pub use config::{Config, DashboardConfig, PathsConfig, TelegramConfig};
pub use dashboard::{DashboardClient, DashboardError, ProjectRunner, RunOutcome};
pub use domain::{Phase, ProjectError, ProjectPaths, ProjectWorkspace};
pub use progress::{ProgressEstimator, ProgressReport};
pub use state::{RegistryError, RegistryStore, WatchEntry, WatchRegistry, WatchState};
pub use telegram::{BotApi, MessageSender, TelegramClient, TelegramError};
pub use watcher::{Notifier, NotifierConfig};
