//! Task domain model

use crate::core::error::ReleaseError;
use crate::core::state::TaskState;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Successful result of a task action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { summary: String },
    /// Nothing to do; dependents still run
    Skipped { reason: String },
}

impl TaskOutcome {
    pub fn completed(summary: impl Into<String>) -> Self {
        TaskOutcome::Completed {
            summary: summary.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        TaskOutcome::Skipped { reason: reason.into() }
    }
}

/// The work a task performs
#[async_trait]
pub trait TaskAction: Send + Sync {
    async fn run(&self) -> Result<TaskOutcome, ReleaseError>;
}

/// Adapts an async closure into a [`TaskAction`]
pub struct FnAction<F>(F);

#[async_trait]
impl<F, Fut> TaskAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<TaskOutcome, ReleaseError>> + Send,
{
    async fn run(&self) -> Result<TaskOutcome, ReleaseError> {
        (self.0)().await
    }
}

/// A single unit of work in a pipeline
#[derive(Clone)]
pub struct Task {
    /// Unique task identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    pub description: Option<String>,

    /// IDs of tasks that must succeed (or be skipped) first
    pub dependencies: Vec<String>,

    /// A failing best-effort task only cancels its own dependents
    pub best_effort: bool,

    /// Timeout in seconds (falls back to the engine default)
    pub timeout_secs: Option<u64>,

    /// Runtime state
    pub state: TaskState,

    action: Arc<dyn TaskAction>,
}

impl Task {
    pub fn new(id: impl Into<String>, action: Arc<dyn TaskAction>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
            dependencies: Vec::new(),
            best_effort: false,
            timeout_secs: None,
            state: TaskState::Pending,
            action,
        }
    }

    /// Create a task from an async closure
    pub fn from_fn<F, Fut>(id: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TaskOutcome, ReleaseError>> + Send + 'static,
    {
        Self::new(id, Arc::new(FnAction(f)))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn action(&self) -> Arc<dyn TaskAction> {
        self.action.clone()
    }

    /// Check if all dependencies are in `satisfied`
    pub fn dependencies_satisfied(&self, satisfied: &HashSet<String>) -> bool {
        self.dependencies.iter().all(|dep| satisfied.contains(dep))
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("best_effort", &self.best_effort)
            .field("timeout_secs", &self.timeout_secs)
            .field("state", &self.state)
            .finish()
    }
}
