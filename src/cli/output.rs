//! CLI output formatting

use crate::core::{ExecutionStatus, LevelRules, Pipeline, TaskState};
use crate::execution::ExecutionEvent;
use crate::report::{PipelineReport, TaskReport};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Create a progress bar
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a task state for display
pub fn format_task_state(state: &TaskState) -> String {
    match state {
        TaskState::Pending => style("PENDING").dim().to_string(),
        TaskState::Running { .. } => style("RUNNING").yellow().to_string(),
        TaskState::Completed { .. } => style("SUCCEEDED").green().to_string(),
        TaskState::Failed { .. } => style("FAILED").red().to_string(),
        TaskState::Skipped { .. } => style("SKIPPED").dim().to_string(),
        TaskState::Cancelled { .. } => style("CANCELLED").yellow().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Whether an event finishes a task
pub fn is_task_finished(event: &ExecutionEvent) -> bool {
    matches!(
        event,
        ExecutionEvent::TaskCompleted { .. }
            | ExecutionEvent::TaskSkipped { .. }
            | ExecutionEvent::TaskFailed { .. }
            | ExecutionEvent::TaskCancelled { .. }
    )
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            total_tasks,
        } => format!(
            "{} Starting release {} ({}, {} tasks)",
            ROCKET,
            style(pipeline_name).bold(),
            style(&execution_id.to_string()[..8]).dim(),
            total_tasks
        ),
        ExecutionEvent::TaskStarted { task_id } => format!("{} {}", SPINNER, style(task_id).cyan()),
        ExecutionEvent::TaskCompleted { task_id, summary } => {
            format!("{} {} {}", CHECK, style(task_id).green(), style(summary).dim())
        }
        ExecutionEvent::TaskSkipped { task_id, reason } => {
            format!("{} {} ({})", SKIP, style(task_id).dim(), reason)
        }
        ExecutionEvent::TaskFailed {
            task_id,
            error,
            best_effort,
        } => {
            let icon = if *best_effort { WARN } else { CROSS };
            format!("{} {}: {}", icon, style(task_id).red(), style(error).dim())
        }
        ExecutionEvent::TaskCancelled { task_id, reason } => {
            format!("{} {} cancelled: {}", INFO, style(task_id).yellow(), style(reason).dim())
        }
        ExecutionEvent::PipelineCompleted { execution_id, status } => format!(
            "{} Release ({}) {}",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

/// One line per task of a finished run
pub fn format_report(report: &PipelineReport) -> String {
    let mut lines = vec![format!(
        "{} {} {} ({}) - {}",
        INFO,
        style(&report.pipeline_name).bold(),
        style(&report.version).cyan(),
        report.level,
        format_status(report.status)
    )];
    lines.extend(report.tasks.iter().map(format_task_report));
    lines.join("\n")
}

fn format_task_report(task: &TaskReport) -> String {
    let outcome = match task.outcome.as_str() {
        "succeeded" => style(task.outcome.as_str()).green(),
        "failed" => style(task.outcome.as_str()).red(),
        "cancelled" => style(task.outcome.as_str()).yellow(),
        _ => style(task.outcome.as_str()).dim(),
    };
    match &task.detail {
        Some(detail) => format!("  {:<24} {} {}", task.id, outcome, style(detail).dim()),
        None => format!("  {:<24} {}", task.id, outcome),
    }
}

/// Numbered task list in execution order with dependencies
pub fn format_plan(pipeline: &Pipeline) -> String {
    pipeline
        .tasks()
        .enumerate()
        .map(|(i, task)| {
            let mut line = format!("{:>3}. {} - {}", i + 1, style(&task.id).bold(), task.name);
            if !task.dependencies.is_empty() {
                line.push_str(&format!(" {}", style(format!("(after {})", task.dependencies.join(", "))).dim()));
            }
            if task.best_effort {
                line.push_str(&format!(" {}", style("[best-effort]").yellow()));
            }
            if let Some(description) = &task.description {
                line.push_str(&format!("\n       {}", style(description).dim()));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Suffix rules in evaluation order, then the fallbacks
pub fn format_level_rules(rules: &LevelRules) -> String {
    let mut lines: Vec<String> = rules
        .rules
        .iter()
        .map(|rule| format!("  {} -> {}", rule.pattern.display(), style(rule.level).cyan()))
        .collect();
    lines.push(format!("  (other suffix) -> {}", style(rules.unmatched_suffix).cyan()));
    lines.push(format!("  (0.x, no suffix) -> {}", style(rules.zero_major).cyan()));
    lines.push(format!("  (no suffix) -> {}", style(rules.stable).cyan()));
    lines.join("\n")
}
