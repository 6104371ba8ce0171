//! Build progress estimation
//!
//! Reconstructs phase, percent-complete and ETA for a project from the status
//! record and marker files the build pipeline leaves behind.

mod estimator;
mod render;
mod status;

pub use estimator::{
    ETA_FAILED, ETA_PASSED, FAILED_FLOOR, MILESTONE_COUNT, MILESTONE_LABELS, MILESTONE_WEIGHTS, Milestone,
    ProgressEstimator, ProgressReport, base_percent, compute_percent, eta_label,
};
pub use render::{progress_bar, render_notification, render_status};
pub use status::{StatusRecord, read_status};
