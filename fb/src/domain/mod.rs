//! Domain types for factorybot
//!
//! The build phase of a project and the on-disk layout of the projects root.

mod phase;
mod project;

pub use phase::Phase;
pub use project::{
    PROJECT_PREFIX, ProjectError, ProjectPaths, ProjectWorkspace, detect_stack, is_valid_project_id, new_project_id,
};
