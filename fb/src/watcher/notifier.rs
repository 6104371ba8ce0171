//! Background notifier
//!
//! Every tick re-estimates each watched project and pushes one message per
//! terminal-phase transition. `last_notified` is the only memory between
//! ticks, so a project that flips FAILED -> RUNNING -> FAILED is announced once.

use std::sync::Arc;

use eyre::{Result, WrapErr};
use tracing::{debug, error, info, warn};

use super::config::NotifierConfig;
use crate::progress::{ProgressEstimator, render_notification};
use crate::state::{WatchEntry, WatchRegistry};
use crate::telegram::MessageSender;

/// Polls the watch table and notifies subscribers of finished projects
pub struct Notifier {
    config: NotifierConfig,
    registry: WatchRegistry,
    estimator: ProgressEstimator,
    sender: Arc<dyn MessageSender>,
}

impl Notifier {
    pub fn new(
        config: NotifierConfig,
        registry: WatchRegistry,
        estimator: ProgressEstimator,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        Self {
            config,
            registry,
            estimator,
            sender,
        }
    }

    /// Run one pass over every watched project
    ///
    /// Returns the number of projects a notification went out for.
    pub async fn check_once(&self) -> Result<usize> {
        debug!("Notifier::check_once: called");
        let entries = self
            .registry
            .list_watched()
            .await
            .wrap_err("Failed to list watched projects")?;

        let mut notified = 0;
        for entry in entries {
            if self.check_project(&entry).await {
                notified += 1;
            }
        }

        debug!(notified, "Notifier::check_once: pass complete");
        Ok(notified)
    }

    async fn check_project(&self, entry: &WatchEntry) -> bool {
        let project_id = entry.project_id.as_str();
        let report = self.estimator.estimate(project_id);
        let phase = report.phase;

        if !phase.is_terminal() || entry.last_notified == Some(phase) {
            debug!(%project_id, %phase, last_notified = ?entry.last_notified, "check_project: nothing to send");
            return false;
        }

        info!(%project_id, %phase, subscribers = entry.subscribers.len(), "Project reached terminal phase");
        let text = render_notification(&report);
        for chat_id in &entry.subscribers {
            if let Err(e) = self.sender.send_text(chat_id, &text).await {
                warn!(%project_id, %chat_id, error = %e, "Failed to deliver notification");
            }
        }

        // marked even when some deliveries failed; those chats are not retried
        if let Err(e) = self.registry.set_last_notified(project_id, phase).await {
            warn!(%project_id, %phase, error = %e, "Failed to record notification");
        }
        true
    }

    /// Run the notifier loop
    ///
    /// Runs for the life of the process; a failed pass is logged and the
    /// next one starts after the usual interval.
    pub async fn run(self) -> Result<()> {
        info!(interval_secs = self.config.poll_interval_secs, "Notifier started");

        loop {
            match self.check_once().await {
                Ok(notified) => {
                    if notified > 0 {
                        debug!(notified, "Notifications sent");
                    }
                }
                Err(e) => {
                    error!(error = %e, "Notifier pass failed");
                }
            }

            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }
}
