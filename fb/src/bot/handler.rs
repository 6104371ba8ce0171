//! Conversation logic
//!
//! `BotHandler` turns one incoming text or button press into at most one reply.
//! It never talks to Telegram itself, which keeps it testable without a network.

use std::sync::Arc;

use eyre::{Context, Result};
use tracing::{debug, info, warn};

use super::menu::{self, CALLBACK_RUN, CALLBACK_STATUS, LIST_LIMIT, PICKER_LIMIT, QUICK_SPEC_MIN_CHARS};
use crate::dashboard::ProjectRunner;
use crate::domain::{ProjectWorkspace, is_valid_project_id, new_project_id};
use crate::progress::{ProgressEstimator, render_status};
use crate::state::{ChatUpdate, WatchRegistry};
use crate::telegram::{ParseMode, ReplyMarkup};

/// What the bot should do in response to an update
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Send a new message
    Text {
        text: String,
        markup: Option<ReplyMarkup>,
    },
    /// Replace the text of the message carrying the pressed button
    Edit {
        text: String,
        parse_mode: Option<ParseMode>,
    },
}

impl Reply {
    fn with_menu(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            markup: Some(menu::main_keyboard()),
        }
    }

    fn with_markup(text: impl Into<String>, markup: ReplyMarkup) -> Self {
        Self::Text {
            text: text.into(),
            markup: Some(markup),
        }
    }

    fn edit(text: impl Into<String>) -> Self {
        Self::Edit {
            text: text.into(),
            parse_mode: None,
        }
    }
}

/// Handles operator conversations
pub struct BotHandler {
    registry: WatchRegistry,
    workspace: ProjectWorkspace,
    estimator: ProgressEstimator,
    runner: Arc<dyn ProjectRunner>,
}

impl BotHandler {
    pub fn new(
        registry: WatchRegistry,
        workspace: ProjectWorkspace,
        estimator: ProgressEstimator,
        runner: Arc<dyn ProjectRunner>,
    ) -> Self {
        Self {
            registry,
            workspace,
            estimator,
            runner,
        }
    }

    /// Handle a text message
    ///
    /// Returns `None` for slash commands the bot doesn't know.
    pub async fn handle_text(&self, chat_id: &str, text: &str) -> Result<Option<Reply>> {
        let msg = text.trim();
        debug!(%chat_id, len = msg.len(), "handle_text: called");

        if let Some(command) = msg.strip_prefix('/') {
            // "/start@factory_bot" addresses this bot in group chats
            let name = command.split_whitespace().next().unwrap_or_default();
            let name = name.split('@').next().unwrap_or_default();
            return Ok(match name {
                "start" => Some(Reply::with_menu(menu::WELCOME_TEXT)),
                "help" => Some(Reply::with_menu(menu::HELP_TEXT)),
                _ => {
                    debug!(%chat_id, %name, "handle_text: unknown command ignored");
                    None
                }
            });
        }

        let reply = match msg {
            menu::BTN_HELP => Reply::with_menu(menu::HELP_TEXT),
            menu::BTN_NEW_PROJECT => self.new_project(chat_id).await?,
            menu::BTN_ADD_SPEC => self.add_spec(chat_id).await?,
            menu::BTN_RUN => self.pick_project("🚀", CALLBACK_RUN, menu::PICK_TO_RUN, menu::NO_PROJECTS_TO_RUN),
            menu::BTN_STATUS => self.pick_project("📊", CALLBACK_STATUS, menu::PICK_FOR_STATUS, menu::NO_PROJECTS),
            menu::BTN_MY_PROJECTS => self.my_projects(),
            _ => self.free_text(chat_id, msg).await?,
        };
        Ok(Some(reply))
    }

    /// Handle an inline button press
    ///
    /// Returns `None` for callback data the bot didn't produce.
    pub async fn handle_callback(&self, chat_id: &str, data: &str) -> Result<Option<Reply>> {
        debug!(%chat_id, %data, "handle_callback: called");

        if let Some(project_id) = data.strip_prefix(CALLBACK_RUN) {
            if !is_valid_project_id(project_id) {
                warn!(%chat_id, %project_id, "Run requested for invalid project id");
                return Ok(Some(Reply::edit(menu::INVALID_PROJECT)));
            }
            return self.run_project(chat_id, project_id).await.map(Some);
        }

        if let Some(project_id) = data.strip_prefix(CALLBACK_STATUS) {
            if !is_valid_project_id(project_id) {
                warn!(%chat_id, %project_id, "Status requested for invalid project id");
                return Ok(Some(Reply::edit(menu::INVALID_PROJECT)));
            }
            // plain text: updated_at comes verbatim from the build's status record
            let report = self.estimator.estimate(project_id);
            return Ok(Some(Reply::edit(render_status(&report))));
        }

        debug!(%chat_id, %data, "handle_callback: unknown callback ignored");
        Ok(None)
    }

    async fn new_project(&self, chat_id: &str) -> Result<Reply> {
        let project_id = new_project_id();
        self.workspace
            .create(&project_id, "")
            .context(format!("Failed to create project {}", project_id))?;
        self.registry
            .update_chat(
                chat_id,
                vec![
                    ChatUpdate::SetLastProject(project_id.clone()),
                    ChatUpdate::SetPendingSpec(Some(project_id.clone())),
                ],
            )
            .await?;
        self.registry.subscribe(&project_id, chat_id).await?;

        info!(%chat_id, %project_id, "Project created from menu");
        Ok(Reply::with_menu(menu::project_created(&project_id)))
    }

    async fn add_spec(&self, chat_id: &str) -> Result<Reply> {
        let session = self.registry.get_chat(chat_id).await?;
        let Some(project_id) = session.last_project_id else {
            return Ok(Reply::with_menu(menu::NO_PROJECT_YET));
        };

        self.registry
            .update_chat(chat_id, vec![ChatUpdate::SetPendingSpec(Some(project_id.clone()))])
            .await?;
        Ok(Reply::with_menu(menu::send_spec_for(&project_id)))
    }

    fn pick_project(&self, icon: &str, callback_prefix: &str, prompt: &str, empty: &str) -> Reply {
        let ids = self.workspace.list(PICKER_LIMIT);
        if ids.is_empty() {
            return Reply::with_menu(empty);
        }
        Reply::with_markup(prompt, menu::project_picker(icon, callback_prefix, &ids))
    }

    fn my_projects(&self) -> Reply {
        let ids = self.workspace.list(LIST_LIMIT);
        if ids.is_empty() {
            return Reply::with_menu(menu::NO_PROJECTS);
        }
        Reply::with_menu(menu::project_list(&ids))
    }

    /// Text that isn't a menu button: a pending spec, a quick spec, or noise
    async fn free_text(&self, chat_id: &str, msg: &str) -> Result<Reply> {
        let session = self.registry.get_chat(chat_id).await?;

        if let Some(project_id) = session.pending_spec_for {
            self.workspace
                .create(&project_id, msg)
                .context(format!("Failed to save spec for {}", project_id))?;
            self.registry
                .update_chat(chat_id, vec![ChatUpdate::SetPendingSpec(None)])
                .await?;
            info!(%chat_id, %project_id, "Spec saved");
            return Ok(Reply::with_menu(menu::spec_saved(&project_id)));
        }

        if msg.chars().count() > QUICK_SPEC_MIN_CHARS {
            let project_id = new_project_id();
            self.workspace
                .create(&project_id, msg)
                .context(format!("Failed to create project {}", project_id))?;
            self.registry
                .update_chat(chat_id, vec![ChatUpdate::SetLastProject(project_id.clone())])
                .await?;
            self.registry.subscribe(&project_id, chat_id).await?;
            info!(%chat_id, %project_id, "Project created from free text");
            return Ok(Reply::with_menu(menu::quick_project_created(&project_id)));
        }

        Ok(Reply::with_menu(menu::MENU_HINT))
    }

    async fn run_project(&self, chat_id: &str, project_id: &str) -> Result<Reply> {
        let body = match self.runner.run(project_id).await {
            Ok(outcome) => format!("HTTP {}\n{}", outcome.code, outcome.data),
            Err(e) => {
                warn!(%chat_id, %project_id, error = %e, "Run request failed");
                format!("⚠️ {}", e)
            }
        };

        self.registry
            .update_chat(chat_id, vec![ChatUpdate::SetLastProject(project_id.to_string())])
            .await?;
        self.registry.subscribe(project_id, chat_id).await?;

        Ok(Reply::edit(format!("🚀 تشغيل {}\n{}", project_id, body)))
    }
}
