//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Pipeline has not started
    Pending,
    /// Pipeline is currently running
    Running,
    /// Every task succeeded or was skipped
    Completed,
    /// At least one task failed
    Failed,
}

/// State of a single task
///
/// A task moves `Pending -> Running -> terminal` exactly once, or goes
/// straight from `Pending` to `Cancelled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for dependencies
    Pending,
    /// Currently running
    Running { started_at: DateTime<Utc> },
    /// Finished successfully
    Completed {
        summary: String,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Finished with an error
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Ran and decided there was nothing to do
    Skipped { reason: String },
    /// Never started because a dependency failed or the pipeline aborted
    Cancelled { reason: String },
}

impl TaskState {
    /// Check if task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Pending | TaskState::Running { .. })
    }

    /// Whether dependents of a task in this state may start
    pub fn unblocks_dependents(&self) -> bool {
        matches!(self, TaskState::Completed { .. } | TaskState::Skipped { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running { .. } => "running",
            TaskState::Completed { .. } => "succeeded",
            TaskState::Failed { .. } => "failed",
            TaskState::Skipped { .. } => "skipped",
            TaskState::Cancelled { .. } => "cancelled",
        }
    }
}

/// Overall pipeline state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub skipped_tasks: usize,
    pub failed_tasks: usize,
    pub cancelled_tasks: usize,
    pub running_tasks: usize,
}

impl PipelineState {
    /// Create a new pipeline state
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            total_tasks: 0,
            completed_tasks: 0,
            skipped_tasks: 0,
            failed_tasks: 0,
            cancelled_tasks: 0,
            running_tasks: 0,
        }
    }

    /// Mark pipeline as started
    pub fn start(&mut self, total_tasks: usize) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_tasks = total_tasks;
    }

    /// Mark pipeline as completed
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark pipeline as failed
    pub fn fail(&mut self) {
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    /// Recount tasks from their states
    pub fn update_counts<'a>(&mut self, states: impl Iterator<Item = &'a TaskState>) {
        let (mut total, mut completed, mut skipped, mut failed, mut cancelled, mut running) = (0, 0, 0, 0, 0, 0);
        for state in states {
            total += 1;
            match state {
                TaskState::Completed { .. } => completed += 1,
                TaskState::Skipped { .. } => skipped += 1,
                TaskState::Failed { .. } => failed += 1,
                TaskState::Cancelled { .. } => cancelled += 1,
                TaskState::Running { .. } => running += 1,
                TaskState::Pending => {}
            }
        }
        self.total_tasks = total;
        self.completed_tasks = completed;
        self.skipped_tasks = skipped;
        self.failed_tasks = failed;
        self.cancelled_tasks = cancelled;
        self.running_tasks = running;
    }

    /// Calculate progress percentage (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_tasks == 0 {
            return 0.0;
        }
        let done = self.completed_tasks + self.skipped_tasks + self.failed_tasks + self.cancelled_tasks;
        done as f64 / self.total_tasks as f64
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
