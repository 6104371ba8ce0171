//! Notifier configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the background Notifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Seconds between two passes over the watch table
    #[serde(rename = "poll-interval-secs", default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    60
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl NotifierConfig {
    /// Get the poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
