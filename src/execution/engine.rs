//! Main execution engine - orchestrates the entire pipeline run

use crate::core::{ExecutionStatus, Pipeline, ReleaseError, TaskOutcome, TaskState};
use crate::execution::{ExecutionResult, ExecutionScheduler, SchedulingStrategy, TaskExecutor};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        total_tasks: usize,
    },
    TaskStarted {
        task_id: String,
    },
    TaskCompleted {
        task_id: String,
        summary: String,
    },
    TaskSkipped {
        task_id: String,
        reason: String,
    },
    TaskFailed {
        task_id: String,
        error: String,
        best_effort: bool,
    },
    TaskCancelled {
        task_id: String,
        reason: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Main pipeline execution engine
pub struct ExecutionEngine {
    scheduler: ExecutionScheduler,
    executor: Arc<TaskExecutor>,
    event_handlers: Vec<EventHandler>,
}

impl ExecutionEngine {
    pub fn new(strategy: SchedulingStrategy) -> Self {
        Self {
            scheduler: ExecutionScheduler::new(strategy),
            executor: Arc::new(TaskExecutor::new()),
            event_handlers: Vec::new(),
        }
    }

    /// Timeout applied to tasks that do not set their own
    pub fn with_default_timeout(mut self, timeout_secs: u64) -> Self {
        self.executor = Arc::new(TaskExecutor::new().with_default_timeout(timeout_secs));
        self
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the entire pipeline
    ///
    /// Returns `TaskFailed` when a task that is not best-effort fails. In that
    /// case no further task starts, running tasks are allowed to finish and
    /// everything still pending is cancelled.
    pub async fn execute(&self, pipeline: &mut Pipeline) -> Result<(), ReleaseError> {
        let execution_id = pipeline.state.execution_id;
        let pipeline_name = pipeline.name.clone();

        info!("Starting pipeline execution: {} ({})", pipeline_name, execution_id);
        pipeline.state.start(pipeline.len());
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline_name.clone(),
            total_tasks: pipeline.len(),
        });

        let mut running: JoinSet<(String, ExecutionResult)> = JoinSet::new();
        let mut abort: Option<(String, ReleaseError)> = None;

        loop {
            if abort.is_none() {
                for task_id in self.scheduler.next_tasks(pipeline) {
                    self.start_task(pipeline, &task_id, &mut running);
                }
            }

            let Some(joined) = running.join_next().await else {
                break;
            };

            match joined {
                Ok((task_id, result)) => {
                    if let Some(error) = self.finish_task(pipeline, &task_id, result) {
                        if abort.is_none() {
                            error!("Task {} failed, aborting pipeline: {}", task_id, error);
                            abort = Some((task_id, error));
                        }
                    }
                }
                // The executor isolates action panics, so this only happens on runtime shutdown
                Err(e) => error!("Task wrapper ended unexpectedly: {}", e),
            }
            pipeline.update_state_counts();
        }

        let reason = match &abort {
            Some((task_id, _)) => format!("pipeline aborted after '{}' failed", task_id),
            None => "dependencies never became ready".to_string(),
        };
        for task_id in pipeline.cancel_pending(&reason) {
            self.emit_event(ExecutionEvent::TaskCancelled {
                task_id,
                reason: reason.clone(),
            });
        }
        self.fail_lost_tasks(pipeline);
        pipeline.update_state_counts();

        let status = if pipeline.any_task_failed() {
            pipeline.state.fail();
            ExecutionStatus::Failed
        } else {
            pipeline.state.complete();
            ExecutionStatus::Completed
        };

        info!("Pipeline execution finished: {} - {:?}", pipeline_name, status);
        self.emit_event(ExecutionEvent::PipelineCompleted { execution_id, status });

        match abort {
            Some((task, source)) => Err(ReleaseError::TaskFailed {
                task,
                source: Box::new(source),
            }),
            None => Ok(()),
        }
    }

    fn start_task(&self, pipeline: &mut Pipeline, task_id: &str, running: &mut JoinSet<(String, ExecutionResult)>) {
        let Some(task) = pipeline.task_mut(task_id) else {
            return;
        };
        task.state = TaskState::Running { started_at: Utc::now() };
        let action = task.action();
        let timeout_secs = task.timeout_secs;
        info!("Starting task: {}", task.name);

        self.emit_event(ExecutionEvent::TaskStarted {
            task_id: task_id.to_string(),
        });

        let executor = self.executor.clone();
        let task_id = task_id.to_string();
        running.spawn(async move {
            let result = executor.execute(&task_id, action, timeout_secs).await;
            (task_id, result)
        });
    }

    /// Record a finished task; returns the error if the pipeline must abort
    fn finish_task(&self, pipeline: &mut Pipeline, task_id: &str, result: ExecutionResult) -> Option<ReleaseError> {
        let Some(task) = pipeline.task_mut(task_id) else {
            return None;
        };
        let started_at = match task.state {
            TaskState::Running { started_at } => started_at,
            _ => Utc::now(),
        };
        let best_effort = task.best_effort;

        match result {
            ExecutionResult::Success(TaskOutcome::Completed { summary }) => {
                info!("Task {} completed: {}", task_id, summary);
                task.state = TaskState::Completed {
                    summary: summary.clone(),
                    started_at,
                    completed_at: Utc::now(),
                };
                self.emit_event(ExecutionEvent::TaskCompleted {
                    task_id: task_id.to_string(),
                    summary,
                });
                None
            }
            ExecutionResult::Success(TaskOutcome::Skipped { reason }) => {
                info!("Task {} skipped: {}", task_id, reason);
                task.state = TaskState::Skipped { reason: reason.clone() };
                self.emit_event(ExecutionEvent::TaskSkipped {
                    task_id: task_id.to_string(),
                    reason,
                });
                None
            }
            ExecutionResult::Failed(error) => {
                task.state = TaskState::Failed {
                    error: error.to_string(),
                    started_at,
                    failed_at: Utc::now(),
                };
                self.emit_event(ExecutionEvent::TaskFailed {
                    task_id: task_id.to_string(),
                    error: error.to_string(),
                    best_effort,
                });

                if !best_effort {
                    return Some(error);
                }

                warn!("Best-effort task {} failed: {}", task_id, error);
                let reason = format!("dependency '{}' failed", task_id);
                for dependent in pipeline.dependents_of(task_id) {
                    if let Some(t) = pipeline.task_mut(&dependent) {
                        if matches!(t.state, TaskState::Pending) {
                            t.state = TaskState::Cancelled { reason: reason.clone() };
                            self.emit_event(ExecutionEvent::TaskCancelled {
                                task_id: dependent,
                                reason: reason.clone(),
                            });
                        }
                    }
                }
                None
            }
        }
    }

    /// Tasks left running after the join set drained never reported back
    fn fail_lost_tasks(&self, pipeline: &mut Pipeline) {
        let lost: Vec<String> = pipeline.running_tasks().iter().map(|t| t.id.clone()).collect();
        for task_id in lost {
            if let Some(task) = pipeline.task_mut(&task_id) {
                let started_at = match task.state {
                    TaskState::Running { started_at } => started_at,
                    _ => Utc::now(),
                };
                task.state = TaskState::Failed {
                    error: "task did not report a result".to_string(),
                    started_at,
                    failed_at: Utc::now(),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Task;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn ok(id: &str) -> Task {
        Task::from_fn(id, || async { Ok(TaskOutcome::completed("ok")) })
    }

    fn failing(id: &str) -> Task {
        Task::from_fn(id, || async { Err(ReleaseError::InvalidConfig("broken".into())) })
    }

    fn build(tasks: Vec<Task>) -> Pipeline {
        let mut builder = Pipeline::builder("test");
        for task in tasks {
            builder.register(task);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_runs_every_task_once_in_dependency_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let runs = Arc::new(AtomicUsize::new(0));
        let recording = |id: &'static str| {
            let order = order.clone();
            let runs = runs.clone();
            Task::from_fn(id, move || {
                let order = order.clone();
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    order.lock().unwrap().push(id);
                    Ok(TaskOutcome::completed(id))
                }
            })
        };

        let mut pipeline = build(vec![
            recording("notes").depends_on("hash").depends_on("message"),
            recording("hash"),
            recording("message"),
        ]);
        ExecutionEngine::new(SchedulingStrategy::Parallel)
            .execute(&mut pipeline)
            .await
            .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(order.lock().unwrap().last(), Some(&"notes"));
        assert_eq!(pipeline.state.status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn test_hard_failure_aborts_and_cancels_pending() {
        let mut pipeline = build(vec![failing("package"), ok("copy").depends_on("package"), ok("later").depends_on("copy")]);
        let err = ExecutionEngine::new(SchedulingStrategy::Sequential)
            .execute(&mut pipeline)
            .await
            .unwrap_err();

        assert!(matches!(err, ReleaseError::TaskFailed { ref task, .. } if task == "package"));
        assert!(matches!(pipeline.task("copy").unwrap().state, TaskState::Cancelled { .. }));
        assert!(matches!(pipeline.task("later").unwrap().state, TaskState::Cancelled { .. }));
        assert_eq!(pipeline.state.status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn test_best_effort_failure_only_cancels_dependents() {
        let mut pipeline = build(vec![
            failing("publish:ore").best_effort(),
            ok("announce").depends_on("publish:ore"),
            ok("publish:maven"),
        ]);
        ExecutionEngine::new(SchedulingStrategy::Sequential)
            .execute(&mut pipeline)
            .await
            .unwrap();

        assert!(matches!(pipeline.task("announce").unwrap().state, TaskState::Cancelled { .. }));
        assert!(matches!(pipeline.task("publish:maven").unwrap().state, TaskState::Completed { .. }));
        assert_eq!(pipeline.state.status, ExecutionStatus::Failed);
        assert_eq!(pipeline.state.failed_tasks, 1);
        assert_eq!(pipeline.state.cancelled_tasks, 1);
    }

    #[tokio::test]
    async fn test_skipped_task_unblocks_dependents() {
        let mut pipeline = build(vec![
            Task::from_fn("clean", || async { Ok(TaskOutcome::skipped("nothing to clean")) }),
            ok("copy").depends_on("clean"),
        ]);
        ExecutionEngine::new(SchedulingStrategy::Sequential)
            .execute(&mut pipeline)
            .await
            .unwrap();
        assert!(matches!(pipeline.task("copy").unwrap().state, TaskState::Completed { .. }));
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ExecutionEngine::new(SchedulingStrategy::Sequential);
        let sink = events.clone();
        engine.add_event_handler(move |event| {
            let name = match event {
                ExecutionEvent::PipelineStarted { .. } => "pipeline_started",
                ExecutionEvent::TaskStarted { .. } => "task_started",
                ExecutionEvent::TaskCompleted { .. } => "task_completed",
                ExecutionEvent::PipelineCompleted { .. } => "pipeline_completed",
                _ => "other",
            };
            sink.lock().unwrap().push(name);
        });

        let mut pipeline = build(vec![ok("only")]);
        engine.execute(&mut pipeline).await.unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec!["pipeline_started", "task_started", "task_completed", "pipeline_completed"]
        );
    }
}
