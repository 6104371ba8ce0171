//! Factory dashboard access
//!
//! The dashboard owns build execution; the bot only asks it to start a run.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DashboardConfig;

/// Longest slice of a non-JSON response body kept in a RunOutcome
const TEXT_PREVIEW_CHARS: usize = 300;

/// Errors that can occur triggering a run
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Invalid dashboard URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// HTTP result of a run request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub code: u16,
    pub data: Value,
}

impl RunOutcome {
    /// Build from a status code and raw body
    ///
    /// A JSON body is kept as-is; anything else is wrapped with a short text preview.
    pub fn from_body(code: u16, body: &str) -> Self {
        let data = serde_json::from_str(body).unwrap_or_else(|_| {
            let text: String = body.chars().take(TEXT_PREVIEW_CHARS).collect();
            json!({ "status_code": code, "text": text })
        });
        Self { code, data }
    }
}

/// Something that can start a project build
#[async_trait]
pub trait ProjectRunner: Send + Sync {
    async fn run(&self, project_id: &str) -> Result<RunOutcome, DashboardError>;
}

/// Client for the dashboard's run endpoint
pub struct DashboardClient {
    client: Client,
    base_url: Url,
    user: String,
    pass: String,
}

impl DashboardClient {
    /// Create a client, reading credentials from the configured environment variables
    ///
    /// Unset credentials are sent empty; the dashboard answers 401 in that case.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, DashboardError> {
        debug!(base_url = %config.base_url, "DashboardClient::from_config: called");
        let user = std::env::var(&config.user_env).unwrap_or_default();
        let pass = std::env::var(&config.pass_env).unwrap_or_default();
        Self::new(&config.base_url, user, pass, config.timeout())
    }

    pub fn new(
        base_url: &str,
        user: impl Into<String>,
        pass: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DashboardError> {
        let base_url = Url::parse(base_url).map_err(|e| DashboardError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            user: user.into(),
            pass: pass.into(),
        })
    }

    fn run_url(&self, project_id: &str) -> Result<Url, DashboardError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DashboardError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "projects", project_id, "run"]);
        Ok(url)
    }
}

#[async_trait]
impl ProjectRunner for DashboardClient {
    async fn run(&self, project_id: &str) -> Result<RunOutcome, DashboardError> {
        debug!(%project_id, "DashboardClient::run: called");
        let url = self.run_url(project_id)?;

        let response = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.pass))
            .send()
            .await?;

        let code = response.status().as_u16();
        let body = response.text().await?;
        info!(%project_id, code, "Run requested");
        Ok(RunOutcome::from_body(code, &body))
    }
}
