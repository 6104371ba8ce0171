//! The persisted watch document
//!
//! ```json
//! {
//!   "chats": { "123": { "last_project_id": "prj_...", "pending_spec_for": null } },
//!   "watch": { "prj_...": ["123", "456"] },
//!   "last_notified": { "prj_...": "PASSED" }
//! }
//! ```
//!
//! Missing top-level keys load as empty maps, so documents written before the
//! watch feature existed (`{"chats": {}}`) are still accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::Phase;

/// Per-chat conversation state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSession {
    /// Project the chat last created or ran
    pub last_project_id: Option<String>,
    /// Project whose spec the next free-text message should become
    pub pending_spec_for: Option<String>,
    /// Keys written by other tools; preserved on rewrite
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A single mutation of a chat session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatUpdate {
    SetLastProject(String),
    SetPendingSpec(Option<String>),
}

impl ChatSession {
    pub fn apply(&mut self, update: ChatUpdate) {
        match update {
            ChatUpdate::SetLastProject(project_id) => self.last_project_id = Some(project_id),
            ChatUpdate::SetPendingSpec(project_id) => self.pending_spec_for = project_id,
        }
    }
}

/// One row of the watch table, as seen by the notifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchEntry {
    pub project_id: String,
    pub subscribers: Vec<String>,
    pub last_notified: Option<Phase>,
}

/// Whole registry document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchState {
    pub chats: BTreeMap<String, ChatSession>,
    pub watch: BTreeMap<String, Vec<String>>,
    pub last_notified: BTreeMap<String, String>,
}

impl WatchState {
    /// Add `chat_id` to the project's subscribers; returns false if already there
    pub fn subscribe(&mut self, project_id: &str, chat_id: &str) -> bool {
        let subscribers = self.watch.entry(project_id.to_string()).or_default();
        if subscribers.iter().any(|c| c == chat_id) {
            debug!(%project_id, %chat_id, "WatchState::subscribe: already subscribed");
            return false;
        }
        subscribers.push(chat_id.to_string());
        true
    }

    /// Subscribers in insertion order
    pub fn subscribers(&self, project_id: &str) -> Vec<String> {
        self.watch.get(project_id).cloned().unwrap_or_default()
    }

    /// Last phase notified for the project
    ///
    /// A stored value that isn't a phase name reads as absent, so the next
    /// terminal phase is notified again.
    pub fn last_notified(&self, project_id: &str) -> Option<Phase> {
        let raw = self.last_notified.get(project_id)?;
        match raw.parse::<Phase>() {
            Ok(phase) => Some(phase),
            Err(e) => {
                debug!(%project_id, %raw, error = %e, "WatchState::last_notified: unparsable stored phase");
                None
            }
        }
    }

    pub fn set_last_notified(&mut self, project_id: &str, phase: Phase) {
        self.last_notified
            .insert(project_id.to_string(), phase.as_str().to_string());
    }

    pub fn chat(&self, chat_id: &str) -> ChatSession {
        self.chats.get(chat_id).cloned().unwrap_or_default()
    }

    pub fn chat_mut(&mut self, chat_id: &str) -> &mut ChatSession {
        self.chats.entry(chat_id.to_string()).or_default()
    }

    /// Every watched project with its subscribers and notification mark
    pub fn watch_entries(&self) -> Vec<WatchEntry> {
        self.watch
            .iter()
            .map(|(project_id, subscribers)| WatchEntry {
                project_id: project_id.clone(),
                subscribers: subscribers.clone(),
                last_notified: self.last_notified(project_id),
            })
            .collect()
    }
}
