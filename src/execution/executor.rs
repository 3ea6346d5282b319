//! Task executor - runs a single task action with timeout and panic isolation

use crate::core::{ReleaseError, TaskAction, TaskOutcome};
use std::any::Any;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, error};

/// Result of executing a task
#[derive(Debug)]
pub enum ExecutionResult {
    Success(TaskOutcome),
    Failed(ReleaseError),
}

/// Runs task actions on their own tokio task
#[derive(Debug, Clone, Default)]
pub struct TaskExecutor {
    default_timeout_secs: Option<u64>,
}

impl TaskExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_timeout(mut self, timeout_secs: u64) -> Self {
        self.default_timeout_secs = Some(timeout_secs);
        self
    }

    /// Execute an action; a panic or timeout becomes a failure
    pub async fn execute(
        &self,
        task_id: &str,
        action: Arc<dyn TaskAction>,
        timeout_secs: Option<u64>,
    ) -> ExecutionResult {
        debug!("Executing task: {}", task_id);

        let handle = tokio::spawn(async move { action.run().await });
        let abort = handle.abort_handle();

        let joined = match timeout_secs.or(self.default_timeout_secs) {
            Some(secs) => match timeout(Duration::from_secs(secs), handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    error!("Timeout for task {} after {}s", task_id, secs);
                    return ExecutionResult::Failed(ReleaseError::TaskTimeout(secs));
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(outcome)) => ExecutionResult::Success(outcome),
            Ok(Err(e)) => ExecutionResult::Failed(e),
            Err(join_error) if join_error.is_panic() => {
                let message = panic_message(join_error.into_panic());
                error!("Task {} panicked: {}", task_id, message);
                ExecutionResult::Failed(ReleaseError::TaskPanicked(message))
            }
            Err(join_error) => ExecutionResult::Failed(ReleaseError::TaskPanicked(join_error.to_string())),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Task;

    #[tokio::test]
    async fn test_success() {
        let task = Task::from_fn("ok", || async { Ok(TaskOutcome::completed("done")) });
        let result = TaskExecutor::new().execute("ok", task.action(), None).await;
        assert!(matches!(result, ExecutionResult::Success(TaskOutcome::Completed { .. })));
    }

    #[tokio::test]
    async fn test_panic_is_a_failure() {
        let task = Task::from_fn("boom", || async {
            if true {
                panic!("kaboom");
            }
            Ok(TaskOutcome::completed("unreachable"))
        });
        let result = TaskExecutor::new().execute("boom", task.action(), None).await;
        match result {
            ExecutionResult::Failed(ReleaseError::TaskPanicked(msg)) => assert_eq!(msg, "kaboom"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let task = Task::from_fn("slow", || async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(TaskOutcome::completed("late"))
        });
        let executor = TaskExecutor::new().with_default_timeout(1);
        let result = executor.execute("slow", task.action(), None).await;
        assert!(matches!(result, ExecutionResult::Failed(ReleaseError::TaskTimeout(1))));
    }
}
