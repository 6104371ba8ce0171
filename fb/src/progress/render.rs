//! Chat-facing text for progress reports

use super::estimator::ProgressReport;

const BAR_WIDTH: usize = 10;

/// Ten-cell bar, one cell per 10%
pub fn progress_bar(percent: u8) -> String {
    let filled = (usize::from(percent.min(100)) * BAR_WIDTH) / 100;
    format!("{}{}", "▓".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Full status card shown when an operator asks for a project's status
pub fn render_status(report: &ProgressReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("📊 حالة {}\n", report.project_id));
    out.push_str(&format!("المرحلة: {}\n", report.phase));
    out.push_str(&format!("التقدم: {} {}%\n", progress_bar(report.percent), report.percent));
    out.push_str(&format!("الوقت المتوقع: {}\n", report.eta));
    if let Some(updated_at) = &report.updated_at {
        out.push_str(&format!("آخر تحديث: {}\n", updated_at));
    }

    for milestone in &report.milestones {
        let icon = if milestone.done { "✅" } else { "⏳" };
        out.push_str(&format!("\n{} {}", icon, milestone.label));
    }
    out
}

/// Message pushed to subscribers when a project reaches a terminal phase
pub fn render_notification(report: &ProgressReport) -> String {
    format!(
        "🔔 تحديث المشروع {}\nالمرحلة: {}\nالتقدم: {}%\nالوقت المتوقع: {}",
        report.project_id, report.phase, report.percent, report.eta
    )
}
