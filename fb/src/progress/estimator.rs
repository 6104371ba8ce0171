//! Progress estimation from filesystem markers
//!
//! The estimator keeps no memory between calls: every report is rebuilt from the
//! status record and marker files, so two calls against unchanged files return
//! identical reports.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::status::read_status;
use crate::domain::{Phase, ProjectPaths, is_valid_project_id};

/// Number of milestones tracked per project
pub const MILESTONE_COUNT: usize = 6;

/// Weight of each milestone, in display order; sums to 100
pub const MILESTONE_WEIGHTS: [u8; MILESTONE_COUNT] = [10, 15, 25, 15, 20, 15];

/// Display labels, in the same order as the weights
pub const MILESTONE_LABELS: [&str; MILESTONE_COUNT] = [
    "كتابة المواصفات",
    "بدء التنفيذ",
    "توليد الكود",
    "تشغيل الاختبارات",
    "تجهيز الحزمة",
    "اجتياز الفحص",
];

/// Minimum percent reported for a failed build
pub const FAILED_FLOOR: u8 = 35;

/// ETA shown once a build has passed
pub const ETA_PASSED: &str = "مكتمل";

/// ETA shown once a build has failed
pub const ETA_FAILED: &str = "متوقف بسبب خطأ";

/// One checkpoint inferred from filesystem evidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub label: String,
    pub weight: u8,
    pub done: bool,
}

/// Snapshot of a project's build progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub project_id: String,
    pub phase: Phase,
    pub percent: u8,
    pub eta: String,
    pub done: Vec<String>,
    pub pending: Vec<String>,
    pub updated_at: Option<String>,
    pub milestones: Vec<Milestone>,
}

/// Sum of the weights of the completed milestones
pub fn base_percent(done: &[bool; MILESTONE_COUNT]) -> u32 {
    done.iter()
        .zip(MILESTONE_WEIGHTS)
        .filter(|(done, _)| **done)
        .map(|(_, weight)| u32::from(weight))
        .sum()
}

/// Apply phase overrides to the milestone sum and clamp to 0..=100
pub fn compute_percent(phase: Phase, done: &[bool; MILESTONE_COUNT]) -> u8 {
    let base = base_percent(done);
    let percent = match phase {
        Phase::Passed => 100,
        Phase::Failed => base.max(u32::from(FAILED_FLOOR)),
        Phase::NotStarted | Phase::Running => base,
    };
    percent.min(100) as u8
}

/// Rough time remaining for the given phase and percent
pub fn eta_label(phase: Phase, percent: u8) -> String {
    match phase {
        Phase::Passed => ETA_PASSED.to_string(),
        Phase::Failed => ETA_FAILED.to_string(),
        Phase::NotStarted | Phase::Running => {
            let range = match percent {
                0..20 => "12-18",
                20..40 => "8-12",
                40..60 => "5-8",
                60..80 => "3-5",
                _ => "1-3",
            };
            format!("{} minutes", range)
        }
    }
}

/// Derives progress reports for projects under a projects root
#[derive(Debug, Clone)]
pub struct ProgressEstimator {
    projects_root: PathBuf,
}

impl ProgressEstimator {
    pub fn new(projects_root: impl Into<PathBuf>) -> Self {
        Self {
            projects_root: projects_root.into(),
        }
    }

    /// Estimate progress for one project
    ///
    /// Never fails: a missing project, missing markers, or a corrupt status record
    /// all degrade to a coarser report. An id that is not a safe path component is
    /// reported as a project that does not exist.
    pub fn estimate(&self, project_id: &str) -> ProgressReport {
        debug!(%project_id, "ProgressEstimator::estimate: called");
        let (phase, updated_at, flags) = if is_valid_project_id(project_id) {
            let paths = ProjectPaths::new(&self.projects_root, project_id);
            let status = read_status(&paths.status_file());
            let phase = status.as_ref().map_or(Phase::NotStarted, |s| s.phase);
            let flags = milestone_flags(&paths, phase);
            (phase, status.and_then(|s| s.updated_at), flags)
        } else {
            debug!(%project_id, "ProgressEstimator::estimate: invalid project id");
            (Phase::NotStarted, None, [false; MILESTONE_COUNT])
        };

        let percent = compute_percent(phase, &flags);
        let eta = eta_label(phase, percent);

        let milestones: Vec<Milestone> = MILESTONE_LABELS
            .iter()
            .zip(MILESTONE_WEIGHTS)
            .zip(flags)
            .map(|((label, weight), done)| Milestone {
                label: label.to_string(),
                weight,
                done,
            })
            .collect();

        let (done, pending): (Vec<&Milestone>, Vec<&Milestone>) = milestones.iter().partition(|m| m.done);

        debug!(%project_id, %phase, percent, "ProgressEstimator::estimate: computed");
        ProgressReport {
            project_id: project_id.to_string(),
            phase,
            percent,
            eta,
            done: done.into_iter().map(|m| m.label.clone()).collect(),
            pending: pending.into_iter().map(|m| m.label.clone()).collect(),
            updated_at,
            milestones,
        }
    }
}

/// Evaluate each milestone predicate on its own
///
/// Markers can appear out of the natural order (a test log before any build
/// output), so no predicate looks at another's result.
fn milestone_flags(paths: &ProjectPaths, phase: Phase) -> [bool; MILESTONE_COUNT] {
    [
        paths.spec_file().is_file(),
        phase != Phase::NotStarted,
        dir_has_entries(&paths.build_dir()),
        paths.test_log().is_file(),
        paths.artifact().is_file(),
        phase == Phase::Passed,
    ]
}

fn dir_has_entries(dir: &Path) -> bool {
    fs::read_dir(dir).map(|mut entries| entries.next().is_some()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProjectWorkspace;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn write_status(paths: &ProjectPaths, body: &str) {
        fs::create_dir_all(paths.status_file().parent().unwrap()).unwrap();
        fs::write(paths.status_file(), body).unwrap();
    }

    #[test]
    fn test_weights_sum_to_100() {
        assert_eq!(MILESTONE_WEIGHTS.iter().map(|w| u32::from(*w)).sum::<u32>(), 100);
    }

    #[test]
    fn test_missing_project_is_not_started() {
        let temp = TempDir::new().unwrap();
        let estimator = ProgressEstimator::new(temp.path());

        let report = estimator.estimate("prj_missing");

        assert_eq!(report.phase, Phase::NotStarted);
        assert_eq!(report.percent, 0);
        assert_eq!(report.eta, "12-18 minutes");
        assert!(report.done.is_empty());
        assert_eq!(report.pending.len(), MILESTONE_COUNT);
        assert!(report.updated_at.is_none());
    }

    #[test]
    fn test_spec_only() {
        let temp = TempDir::new().unwrap();
        let ws = ProjectWorkspace::new(temp.path());
        ws.create("prj_1", "A todo app").unwrap();
        let estimator = ProgressEstimator::new(temp.path());

        let report = estimator.estimate("prj_1");

        assert_eq!(report.phase, Phase::NotStarted);
        assert_eq!(report.percent, 10);
        assert_eq!(report.eta, "12-18 minutes");
        assert_eq!(report.done, vec![MILESTONE_LABELS[0].to_string()]);
    }

    #[test]
    fn test_failed_is_floored() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::new(temp.path(), "prj_1");
        write_status(&paths, r#"{"phase":"failed"}"#);
        let estimator = ProgressEstimator::new(temp.path());

        let report = estimator.estimate("prj_1");

        assert_eq!(report.phase, Phase::Failed);
        assert_eq!(report.percent, 35);
        assert_eq!(report.eta, "متوقف بسبب خطأ");
    }

    #[test]
    fn test_all_markers_passed() {
        let temp = TempDir::new().unwrap();
        let ws = ProjectWorkspace::new(temp.path());
        let paths = ws.create("prj_1", "spec").unwrap();
        write_status(&paths, r#"{"phase":"passed","updated_at":"2025-03-01T10:00:00Z"}"#);
        fs::write(paths.build_dir().join("package.json"), "{}").unwrap();
        fs::write(paths.test_log(), "ok").unwrap();
        fs::write(paths.artifact(), "zip").unwrap();
        let estimator = ProgressEstimator::new(temp.path());

        let report = estimator.estimate("prj_1");

        assert_eq!(report.phase, Phase::Passed);
        assert_eq!(report.percent, 100);
        assert_eq!(report.eta, ETA_PASSED);
        assert!(report.pending.is_empty());
        assert_eq!(report.updated_at.as_deref(), Some("2025-03-01T10:00:00Z"));
    }

    #[test]
    fn test_markers_out_of_order() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::new(temp.path(), "prj_1");
        fs::create_dir_all(paths.test_log().parent().unwrap()).unwrap();
        fs::write(paths.test_log(), "").unwrap();
        let estimator = ProgressEstimator::new(temp.path());

        let report = estimator.estimate("prj_1");

        // log present, nothing else: only the log weight counts
        assert_eq!(report.phase, Phase::NotStarted);
        assert_eq!(report.percent, 15);
        assert_eq!(report.done, vec![MILESTONE_LABELS[3].to_string()]);
    }

    #[test]
    fn test_empty_build_dir_is_not_done() {
        let temp = TempDir::new().unwrap();
        let ws = ProjectWorkspace::new(temp.path());
        let paths = ws.create("prj_1", "").unwrap();
        write_status(&paths, r#"{"phase":"running"}"#);
        let estimator = ProgressEstimator::new(temp.path());

        let report = estimator.estimate("prj_1");
        assert_eq!(report.percent, 15);

        fs::write(paths.build_dir().join("index.js"), "").unwrap();
        let report = estimator.estimate("prj_1");
        assert_eq!(report.percent, 40);
        assert_eq!(report.eta, "5-8 minutes");
    }

    #[test]
    fn test_corrupt_status_counts_as_started() {
        let temp = TempDir::new().unwrap();
        let paths = ProjectPaths::new(temp.path(), "prj_1");
        write_status(&paths, "not json");
        let estimator = ProgressEstimator::new(temp.path());

        let report = estimator.estimate("prj_1");

        assert_eq!(report.phase, Phase::Running);
        assert_eq!(report.percent, 15);
        assert_eq!(report.eta, "12-18 minutes");
    }

    #[test]
    fn test_invalid_id_reports_missing_project() {
        let temp = TempDir::new().unwrap();
        let estimator = ProgressEstimator::new(temp.path().join("projects"));
        // a sibling directory that a traversal would reach
        let paths = ProjectPaths::new(temp.path(), "outside");
        write_status(&paths, r#"{"phase":"passed"}"#);

        let report = estimator.estimate("../outside");

        assert_eq!(report.phase, Phase::NotStarted);
        assert_eq!(report.percent, 0);
    }

    #[test]
    fn test_estimate_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let ws = ProjectWorkspace::new(temp.path());
        let paths = ws.create("prj_1", "spec").unwrap();
        write_status(&paths, r#"{"phase":"running","updated_at":"t"}"#);
        let estimator = ProgressEstimator::new(temp.path());

        assert_eq!(estimator.estimate("prj_1"), estimator.estimate("prj_1"));
    }

    #[test]
    fn test_eta_ladder() {
        assert_eq!(eta_label(Phase::Running, 0), "12-18 minutes");
        assert_eq!(eta_label(Phase::Running, 19), "12-18 minutes");
        assert_eq!(eta_label(Phase::Running, 20), "8-12 minutes");
        assert_eq!(eta_label(Phase::Running, 40), "5-8 minutes");
        assert_eq!(eta_label(Phase::Running, 60), "3-5 minutes");
        assert_eq!(eta_label(Phase::Running, 80), "1-3 minutes");
        assert_eq!(eta_label(Phase::Running, 100), "1-3 minutes");
        assert_eq!(eta_label(Phase::Passed, 10), ETA_PASSED);
        assert_eq!(eta_label(Phase::Failed, 90), ETA_FAILED);
    }

    proptest! {
        #[test]
        fn prop_percent_is_weight_sum(done in any::<[bool; MILESTONE_COUNT]>()) {
            let expected: u32 = (0..MILESTONE_COUNT)
                .filter(|i| done[*i])
                .map(|i| u32::from(MILESTONE_WEIGHTS[i]))
                .sum();
            prop_assert_eq!(u32::from(compute_percent(Phase::Running, &done)), expected.min(100));
            prop_assert_eq!(u32::from(compute_percent(Phase::NotStarted, &done)), expected.min(100));
        }

        #[test]
        fn prop_passed_is_always_100(done in any::<[bool; MILESTONE_COUNT]>()) {
            prop_assert_eq!(compute_percent(Phase::Passed, &done), 100);
        }

        #[test]
        fn prop_failed_is_at_least_floor(done in any::<[bool; MILESTONE_COUNT]>()) {
            let percent = compute_percent(Phase::Failed, &done);
            prop_assert!(percent >= FAILED_FLOOR);
            prop_assert!(percent <= 100);
        }
    }
}
