//! Build phase of a factory project

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Coarse lifecycle state of a project build
///
/// Derived from the externally written `state/status.json`. `NotStarted` is only
/// produced when that record is absent; anything present but unrecognized maps
/// to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    NotStarted,
    Running,
    Passed,
    Failed,
}

impl Phase {
    /// Total parse of the raw `phase` field of a status record
    ///
    /// Case-insensitive `passed`/`failed`/`running`; everything else, including a
    /// missing field, is `Running` because the record itself exists.
    pub fn from_status_field(raw: Option<&str>) -> Self {
        debug!(?raw, "Phase::from_status_field: called");
        let Some(raw) = raw else {
            return Self::Running;
        };
        match raw.trim().to_ascii_uppercase().as_str() {
            "PASSED" => Self::Passed,
            "FAILED" => Self::Failed,
            "RUNNING" => Self::Running,
            other => {
                debug!(%other, "Phase::from_status_field: unrecognized phase, treating as running");
                Self::Running
            }
        }
    }

    /// Terminal phases are the only ones that trigger notifications
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Running => "RUNNING",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    /// Strict parse used for persisted values (`last_notified`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOT_STARTED" => Ok(Self::NotStarted),
            "RUNNING" => Ok(Self::Running),
            "PASSED" => Ok(Self::Passed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Unknown phase: {}", s)),
        }
    }
}
