//! Run report written after a release pipeline finishes

use crate::core::{ExecutionStatus, Pipeline, ReleaseError, ReleaseLevel, TaskState};
use crate::release::files;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const REPORT_FILE: &str = "report.json";

/// Final state of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub id: String,
    pub name: String,
    /// `succeeded`, `skipped`, `failed` or `cancelled`
    pub outcome: String,
    /// Summary, skip reason, error or cancellation reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub best_effort: bool,
}

/// Summary of a release run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub execution_id: Uuid,
    pub pipeline_name: String,
    pub version: String,
    pub level: ReleaseLevel,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: f64,
    pub tasks: Vec<TaskReport>,
}

impl PipelineReport {
    /// Summarise a pipeline, tasks in execution order
    pub fn from_pipeline(pipeline: &Pipeline, version: impl Into<String>, level: ReleaseLevel) -> Self {
        let tasks = pipeline
            .tasks()
            .map(|task| {
                let detail = match &task.state {
                    TaskState::Completed { summary, .. } => Some(summary.clone()),
                    TaskState::Failed { error, .. } => Some(error.clone()),
                    TaskState::Skipped { reason } | TaskState::Cancelled { reason } => Some(reason.clone()),
                    TaskState::Pending | TaskState::Running { .. } => None,
                };
                TaskReport {
                    id: task.id.clone(),
                    name: task.name.clone(),
                    outcome: task.state.label().to_string(),
                    detail: detail.filter(|d| !d.is_empty()),
                    best_effort: task.best_effort,
                }
            })
            .collect();

        Self {
            execution_id: pipeline.state.execution_id,
            pipeline_name: pipeline.name.clone(),
            version: version.into(),
            level,
            status: pipeline.state.status,
            started_at: pipeline.state.started_at.unwrap_or_else(Utc::now),
            completed_at: pipeline.state.completed_at,
            progress: pipeline.state.progress(),
            tasks,
        }
    }

    /// False whenever any task failed, best-effort or not
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Completed && self.tasks.iter().all(|t| t.outcome != "failed")
    }

    pub fn task(&self, id: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn count(&self, outcome: &str) -> usize {
        self.tasks.iter().filter(|t| t.outcome == outcome).count()
    }

    pub fn to_json(&self) -> Result<String, ReleaseError> {
        serde_json::to_string_pretty(self).map_err(|e| ReleaseError::InvalidConfig(format!("report encoding: {}", e)))
    }

    /// Write `report.json` into `dir`, returning its path
    pub async fn write_json(&self, dir: &Path) -> Result<PathBuf, ReleaseError> {
        let path = dir.join(REPORT_FILE);
        files::write_file(&path, self.to_json()?.as_bytes()).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Task, TaskOutcome};
    use chrono::Utc;

    fn pipeline() -> Pipeline {
        let mut builder = Pipeline::builder("release");
        builder
            .register(Task::from_fn("package", || async { Ok(TaskOutcome::completed("ok")) }))
            .register(Task::from_fn("publish:ore", || async { Ok(TaskOutcome::completed("ok")) }).best_effort());
        builder.build().unwrap()
    }

    #[test]
    fn test_failed_task_makes_report_unsuccessful() {
        let mut p = pipeline();
        p.task_mut("package").unwrap().state = TaskState::Completed {
            summary: "demo.tar.gz".into(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
        };
        p.task_mut("publish:ore").unwrap().state = TaskState::Failed {
            error: "No credentials available for publish target 'ore'".into(),
            started_at: Utc::now(),
            failed_at: Utc::now(),
        };
        p.update_state_counts();
        p.state.fail();

        let report = PipelineReport::from_pipeline(&p, "1.2.3", ReleaseLevel::Release);
        assert!(!report.is_success());
        assert_eq!(report.task("publish:ore").unwrap().outcome, "failed");
        assert_eq!(report.task("package").unwrap().outcome, "succeeded");
        assert_eq!(report.count("failed"), 1);
    }

    #[tokio::test]
    async fn test_write_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut p = pipeline();
        p.state.complete();
        let report = PipelineReport::from_pipeline(&p, "1.2.3", ReleaseLevel::Release);
        let path = report.write_json(dir.path()).await.unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["pipeline_name"], "release");
        assert_eq!(value["level"], "release");
        assert_eq!(value["tasks"][0]["outcome"], "pending");
    }
}
