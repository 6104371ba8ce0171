//! Reading the build pipeline's status record

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::Phase;

/// What the estimator takes from `state/status.json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub phase: Phase,
    pub updated_at: Option<String>,
}

impl StatusRecord {
    /// Record used when the file exists but can't be read or parsed
    fn degraded() -> Self {
        Self {
            phase: Phase::Running,
            updated_at: None,
        }
    }

    /// Interpret an already-parsed status document
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            debug!("StatusRecord::from_value: status is not an object");
            return Self::degraded();
        };

        let phase = Phase::from_status_field(obj.get("phase").and_then(Value::as_str));
        let updated_at = match obj.get("updated_at") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Self { phase, updated_at }
    }
}

/// Read the status record at `path`
///
/// Returns `None` when the file does not exist. A file that exists but cannot be
/// read or parsed degrades to a `Running` record instead of failing.
pub fn read_status(path: &Path) -> Option<StatusRecord> {
    debug!(path = %path.display(), "read_status: called");
    if !path.is_file() {
        return None;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable status record, treating as running");
            return Some(StatusRecord::degraded());
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(value) => Some(StatusRecord::from_value(&value)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt status record, treating as running");
            Some(StatusRecord::degraded())
        }
    }
}
