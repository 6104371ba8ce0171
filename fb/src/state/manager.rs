//! WatchRegistry - actor that owns the registry store
//!
//! The bot handlers and the notifier both read-modify-write the same document.
//! Routing every command through one task makes each load-mutate-save a single
//! step, so a subscribe can't be lost between the notifier's load and save.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::document::{ChatSession, ChatUpdate, WatchEntry, WatchState};
use super::messages::{RegistryCommand, RegistryError, RegistryResponse};
use super::store::RegistryStore;
use crate::domain::Phase;

/// Handle to send commands to the WatchRegistry
#[derive(Clone)]
pub struct WatchRegistry {
    tx: mpsc::Sender<RegistryCommand>,
}

impl WatchRegistry {
    /// Spawn a new WatchRegistry actor over `store`
    pub fn spawn(store: RegistryStore) -> Self {
        debug!(store = %store.describe(), "WatchRegistry::spawn: called");
        let (tx, rx) = mpsc::channel(256);

        tokio::spawn(actor_loop(store, rx));

        info!("WatchRegistry spawned");
        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<RegistryResponse<T>>) -> RegistryCommand,
    ) -> RegistryResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| RegistryError::ChannelError)?;
        reply_rx.await.map_err(|_| RegistryError::ChannelError)?
    }

    // === Watch operations ===

    /// Subscribe a chat to a project; returns false if it already was
    pub async fn subscribe(&self, project_id: &str, chat_id: &str) -> RegistryResponse<bool> {
        debug!(%project_id, %chat_id, "subscribe: called");
        self.request(|reply| RegistryCommand::Subscribe {
            project_id: project_id.to_string(),
            chat_id: chat_id.to_string(),
            reply,
        })
        .await
    }

    /// Subscribers of a project in insertion order
    pub async fn get_subscribers(&self, project_id: &str) -> RegistryResponse<Vec<String>> {
        debug!(%project_id, "get_subscribers: called");
        self.request(|reply| RegistryCommand::GetSubscribers {
            project_id: project_id.to_string(),
            reply,
        })
        .await
    }

    /// Last phase a notification was sent for
    pub async fn get_last_notified(&self, project_id: &str) -> RegistryResponse<Option<Phase>> {
        debug!(%project_id, "get_last_notified: called");
        self.request(|reply| RegistryCommand::GetLastNotified {
            project_id: project_id.to_string(),
            reply,
        })
        .await
    }

    /// Record that `phase` has been notified for a project
    pub async fn set_last_notified(&self, project_id: &str, phase: Phase) -> RegistryResponse<()> {
        debug!(%project_id, %phase, "set_last_notified: called");
        self.request(|reply| RegistryCommand::SetLastNotified {
            project_id: project_id.to_string(),
            phase,
            reply,
        })
        .await
    }

    /// Snapshot of every watched project
    pub async fn list_watched(&self) -> RegistryResponse<Vec<WatchEntry>> {
        debug!("list_watched: called");
        self.request(|reply| RegistryCommand::ListWatched { reply }).await
    }

    // === Chat session operations ===

    /// Session for a chat (default if the chat is unknown)
    pub async fn get_chat(&self, chat_id: &str) -> RegistryResponse<ChatSession> {
        debug!(%chat_id, "get_chat: called");
        self.request(|reply| RegistryCommand::GetChat {
            chat_id: chat_id.to_string(),
            reply,
        })
        .await
    }

    /// Apply updates to a chat session in order and return the result
    pub async fn update_chat(&self, chat_id: &str, updates: Vec<ChatUpdate>) -> RegistryResponse<ChatSession> {
        debug!(%chat_id, ?updates, "update_chat: called");
        self.request(|reply| RegistryCommand::UpdateChat {
            chat_id: chat_id.to_string(),
            updates,
            reply,
        })
        .await
    }

    /// Stop the actor after queued commands are processed
    pub async fn shutdown(&self) -> RegistryResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(RegistryCommand::Shutdown)
            .await
            .map_err(|_| RegistryError::ChannelError)
    }
}

/// Load, mutate and save the whole document
fn mutate<T>(store: &RegistryStore, f: impl FnOnce(&mut WatchState) -> T) -> RegistryResponse<T> {
    let mut state = store.load();
    let out = f(&mut state);
    store.save(&state)?;
    Ok(out)
}

/// Main actor loop - processes commands sequentially
async fn actor_loop(store: RegistryStore, mut rx: mpsc::Receiver<RegistryCommand>) {
    debug!("actor_loop: called");
    debug!("WatchRegistry actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RegistryCommand::Subscribe {
                project_id,
                chat_id,
                reply,
            } => {
                debug!(%project_id, %chat_id, "actor_loop: Subscribe command");
                let result = mutate(&store, |state| state.subscribe(&project_id, &chat_id));
                if matches!(result, Ok(true)) {
                    info!(%project_id, %chat_id, "Chat subscribed to project");
                }
                let _ = reply.send(result);
            }

            RegistryCommand::GetSubscribers { project_id, reply } => {
                debug!(%project_id, "actor_loop: GetSubscribers command");
                let _ = reply.send(Ok(store.load().subscribers(&project_id)));
            }

            RegistryCommand::GetLastNotified { project_id, reply } => {
                debug!(%project_id, "actor_loop: GetLastNotified command");
                let _ = reply.send(Ok(store.load().last_notified(&project_id)));
            }

            RegistryCommand::SetLastNotified {
                project_id,
                phase,
                reply,
            } => {
                debug!(%project_id, %phase, "actor_loop: SetLastNotified command");
                let result = mutate(&store, |state| state.set_last_notified(&project_id, phase));
                let _ = reply.send(result);
            }

            RegistryCommand::ListWatched { reply } => {
                debug!("actor_loop: ListWatched command");
                let _ = reply.send(Ok(store.load().watch_entries()));
            }

            RegistryCommand::GetChat { chat_id, reply } => {
                debug!(%chat_id, "actor_loop: GetChat command");
                let _ = reply.send(Ok(store.load().chat(&chat_id)));
            }

            RegistryCommand::UpdateChat {
                chat_id,
                updates,
                reply,
            } => {
                debug!(%chat_id, count = updates.len(), "actor_loop: UpdateChat command");
                let result = mutate(&store, |state| {
                    let session = state.chat_mut(&chat_id);
                    for update in updates {
                        session.apply(update);
                    }
                    session.clone()
                });
                let _ = reply.send(result);
            }

            RegistryCommand::Shutdown => {
                info!("WatchRegistry shutting down");
                break;
            }
        }
    }

    debug!("WatchRegistry actor stopped");
}
