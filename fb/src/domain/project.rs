//! Project directories under the factory's projects root
//!
//! Every project lives in `<projects-root>/<project_id>/`. The bot creates the
//! skeleton; the build pipeline fills in the rest.
//!
//! ```text
//! prj_20250101120000/
//! ├── project_spec.md          # operator-supplied spec (optional)
//! ├── prj_20250101120000.zip   # packaged deliverable
//! ├── tasks/
//! ├── repo/                    # build output
//! ├── logs/test.log
//! └── state/
//!     ├── spec.json            # {"stack": "..."}
//!     └── status.json          # {"phase": "...", "updated_at": "..."}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

/// Prefix shared by all generated project ids
pub const PROJECT_PREFIX: &str = "prj_";

/// Errors from project workspace operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Invalid project id: {0:?}")]
    InvalidId(String),

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProjectError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Check that a project id is safe to use as a single path component
pub fn is_valid_project_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Generate a new project id from the current UTC time
pub fn new_project_id() -> String {
    let id = Utc::now().format("prj_%Y%m%d%H%M%S").to_string();
    debug!(%id, "new_project_id: generated");
    id
}

/// Pick the scaffold stack from free-form spec text
pub fn detect_stack(spec: &str) -> &'static str {
    let lower = spec.to_lowercase();
    if lower.contains("laravel") {
        "laravel"
    } else if lower.contains("flutter") {
        "flutter"
    } else {
        "nextjs"
    }
}

/// Marker file locations for one project
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    project_id: String,
    dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(projects_root: &Path, project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            dir: projects_root.join(project_id),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn status_file(&self) -> PathBuf {
        self.dir.join("state").join("status.json")
    }

    pub fn stack_file(&self) -> PathBuf {
        self.dir.join("state").join("spec.json")
    }

    pub fn spec_file(&self) -> PathBuf {
        self.dir.join("project_spec.md")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.dir.join("repo")
    }

    pub fn test_log(&self) -> PathBuf {
        self.dir.join("logs").join("test.log")
    }

    pub fn artifact(&self) -> PathBuf {
        self.dir.join(format!("{}.zip", self.project_id))
    }
}

/// Creates and lists project directories under a projects root
#[derive(Debug, Clone)]
pub struct ProjectWorkspace {
    root: PathBuf,
}

impl ProjectWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve marker paths, rejecting ids that are not a single safe component
    pub fn paths(&self, project_id: &str) -> Result<ProjectPaths, ProjectError> {
        if !is_valid_project_id(project_id) {
            return Err(ProjectError::InvalidId(project_id.to_string()));
        }
        Ok(ProjectPaths::new(&self.root, project_id))
    }

    /// Create the project skeleton, (re)writing the spec when one is given
    ///
    /// Safe to call again on an existing project: directories are kept and
    /// `state/spec.json` is rewritten with the stack detected from the new spec.
    pub fn create(&self, project_id: &str, spec: &str) -> Result<ProjectPaths, ProjectError> {
        debug!(%project_id, spec_len = spec.len(), "ProjectWorkspace::create: called");
        let paths = self.paths(project_id)?;

        for sub in ["tasks", "state", "repo", "logs"] {
            let dir = paths.dir().join(sub);
            fs::create_dir_all(&dir).map_err(|e| ProjectError::io(&dir, e))?;
        }

        if !spec.is_empty() {
            let spec_file = paths.spec_file();
            fs::write(&spec_file, spec).map_err(|e| ProjectError::io(&spec_file, e))?;
        }

        let stack = if spec.is_empty() { "nextjs" } else { detect_stack(spec) };
        let stack_file = paths.stack_file();
        let content = serde_json::to_string_pretty(&serde_json::json!({ "stack": stack }))?;
        fs::write(&stack_file, content).map_err(|e| ProjectError::io(&stack_file, e))?;

        info!(%project_id, %stack, "Project created");
        Ok(paths)
    }

    /// Most recent project ids first, at most `limit`
    ///
    /// A missing projects root is an empty list, not an error.
    pub fn list(&self, limit: usize) -> Vec<String> {
        debug!(root = %self.root.display(), limit, "ProjectWorkspace::list: called");
        let Ok(entries) = fs::read_dir(&self.root) else {
            debug!("ProjectWorkspace::list: projects root not readable");
            return Vec::new();
        };

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name.starts_with(PROJECT_PREFIX))
            .collect();

        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.truncate(limit);
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_id_validation() {
        assert!(is_valid_project_id("prj_20250101120000"));
        assert!(is_valid_project_id("demo-1"));
        assert!(!is_valid_project_id(""));
        assert!(!is_valid_project_id("../etc"));
        assert!(!is_valid_project_id("a/b"));
        assert!(!is_valid_project_id("prj 1"));
    }

    #[test]
    fn test_new_project_id_format() {
        let id = new_project_id();
        assert!(id.starts_with(PROJECT_PREFIX));
        assert_eq!(id.len(), PROJECT_PREFIX.len() + 14);
        assert!(is_valid_project_id(&id));
    }

    #[test]
    fn test_detect_stack() {
        assert_eq!(detect_stack("A Laravel admin panel"), "laravel");
        assert_eq!(detect_stack("mobile app in FLUTTER"), "flutter");
        assert_eq!(detect_stack("a landing page"), "nextjs");
    }

    #[test]
    fn test_paths_layout() {
        let paths = ProjectPaths::new(Path::new("/data/projects"), "prj_1");
        assert_eq!(paths.status_file(), PathBuf::from("/data/projects/prj_1/state/status.json"));
        assert_eq!(paths.spec_file(), PathBuf::from("/data/projects/prj_1/project_spec.md"));
        assert_eq!(paths.build_dir(), PathBuf::from("/data/projects/prj_1/repo"));
        assert_eq!(paths.test_log(), PathBuf::from("/data/projects/prj_1/logs/test.log"));
        assert_eq!(paths.artifact(), PathBuf::from("/data/projects/prj_1/prj_1.zip"));
    }

    #[test]
    fn test_create_without_spec() {
        let temp = TempDir::new().unwrap();
        let ws = ProjectWorkspace::new(temp.path());

        let paths = ws.create("prj_1", "").unwrap();

        assert!(paths.dir().join("tasks").is_dir());
        assert!(paths.build_dir().is_dir());
        assert!(!paths.spec_file().exists());
        let stack: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(paths.stack_file()).unwrap()).unwrap();
        assert_eq!(stack["stack"], "nextjs");
    }

    #[test]
    fn test_create_with_spec_overwrites_stack() {
        let temp = TempDir::new().unwrap();
        let ws = ProjectWorkspace::new(temp.path());

        ws.create("prj_1", "").unwrap();
        let paths = ws.create("prj_1", "Booking app using flutter").unwrap();

        assert_eq!(fs::read_to_string(paths.spec_file()).unwrap(), "Booking app using flutter");
        let stack: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(paths.stack_file()).unwrap()).unwrap();
        assert_eq!(stack["stack"], "flutter");
    }

    #[test]
    fn test_create_rejects_bad_id() {
        let temp = TempDir::new().unwrap();
        let ws = ProjectWorkspace::new(temp.path());

        let result = ws.create("../escape", "spec");
        assert!(matches!(result, Err(ProjectError::InvalidId(_))));
    }

    #[test]
    fn test_list_newest_first_and_filtered() {
        let temp = TempDir::new().unwrap();
        let ws = ProjectWorkspace::new(temp.path());
        for id in ["prj_20240101000000", "prj_20250101000000", "prj_20230101000000"] {
            ws.create(id, "").unwrap();
        }
        fs::create_dir_all(temp.path().join("scratch")).unwrap();
        fs::write(temp.path().join("prj_file"), "not a dir").unwrap();

        assert_eq!(
            ws.list(8),
            vec!["prj_20250101000000", "prj_20240101000000", "prj_20230101000000"]
        );
        assert_eq!(ws.list(1), vec!["prj_20250101000000"]);
    }

    #[test]
    fn test_list_missing_root() {
        let temp = TempDir::new().unwrap();
        let ws = ProjectWorkspace::new(temp.path().join("nope"));
        assert!(ws.list(8).is_empty());
    }
}
