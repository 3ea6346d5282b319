//! Pipeline domain model

use crate::core::error::ReleaseError;
use crate::core::state::{ExecutionStatus, PipelineState, TaskState};
use crate::core::task::Task;
use std::collections::{HashMap, HashSet};

/// Collects tasks before validating them into a [`Pipeline`]
///
/// Registering a task never runs it.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    name: String,
    tasks: Vec<Task>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    pub fn register(&mut self, task: Task) -> &mut Self {
        self.tasks.push(task);
        self
    }

    /// Validate ids, dependencies and acyclicity, then fix the execution order
    pub fn build(self) -> Result<Pipeline, ReleaseError> {
        let mut seen_ids = HashSet::new();
        for task in &self.tasks {
            if !seen_ids.insert(task.id.as_str()) {
                return Err(ReleaseError::InvalidGraph(format!("Duplicate task ID: {}", task.id)));
            }
        }

        for task in &self.tasks {
            for dep in &task.dependencies {
                if !seen_ids.contains(dep.as_str()) {
                    return Err(ReleaseError::InvalidGraph(format!(
                        "Task '{}' depends on non-existent task '{}'",
                        task.id, dep
                    )));
                }
            }
        }

        let registration_order: Vec<String> = self.tasks.iter().map(|t| t.id.clone()).collect();
        let tasks: HashMap<String, Task> = self.tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        let execution_order = Pipeline::topological_sort(&registration_order, &tasks)?;

        Ok(Pipeline {
            name: self.name,
            tasks,
            state: PipelineState::new(),
            execution_order,
        })
    }
}

/// A validated task graph and its execution state
#[derive(Debug)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    tasks: HashMap<String, Task>,

    /// Execution state
    pub state: PipelineState,

    /// Task execution order (topological sort)
    execution_order: Vec<String>,
}

impl Pipeline {
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    /// Get a task by ID
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Get a mutable task by ID
    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in execution order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.execution_order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Get execution order (topological sort)
    pub fn execution_order(&self) -> &[String] {
        &self.execution_order
    }

    /// Pending tasks whose dependencies all succeeded or were skipped, in execution order
    pub fn ready_tasks(&self) -> Vec<&Task> {
        let satisfied: HashSet<String> = self
            .tasks
            .values()
            .filter(|t| t.state.unblocks_dependents())
            .map(|t| t.id.clone())
            .collect();

        self.tasks()
            .filter(|t| matches!(t.state, TaskState::Pending) && t.dependencies_satisfied(&satisfied))
            .collect()
    }

    /// Get all currently running tasks
    pub fn running_tasks(&self) -> Vec<&Task> {
        self.tasks()
            .filter(|t| matches!(t.state, TaskState::Running { .. }))
            .collect()
    }

    /// Check if every task reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.tasks.values().all(|t| t.state.is_terminal())
    }

    /// Check if pipeline has failed
    pub fn has_failed(&self) -> bool {
        self.state.status == ExecutionStatus::Failed
    }

    /// Whether any task ended in failure
    pub fn any_task_failed(&self) -> bool {
        self.tasks
            .values()
            .any(|t| matches!(t.state, TaskState::Failed { .. }))
    }

    /// Every task that depends on `id`, directly or transitively, in execution order
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        let mut affected: HashSet<&str> = HashSet::new();
        affected.insert(id);
        let mut result = Vec::new();
        // Execution order guarantees dependencies come before dependents
        for task_id in &self.execution_order {
            if let Some(task) = self.tasks.get(task_id) {
                if task.dependencies.iter().any(|d| affected.contains(d.as_str())) {
                    affected.insert(task_id.as_str());
                    result.push(task_id.clone());
                }
            }
        }
        result
    }

    /// Cancel every task still pending
    pub fn cancel_pending(&mut self, reason: &str) -> Vec<String> {
        let mut cancelled = Vec::new();
        for id in &self.execution_order {
            if let Some(task) = self.tasks.get_mut(id) {
                if matches!(task.state, TaskState::Pending) {
                    task.state = TaskState::Cancelled {
                        reason: reason.to_string(),
                    };
                    cancelled.push(id.clone());
                }
            }
        }
        cancelled
    }

    /// Recompute the counters in `state`
    pub fn update_state_counts(&mut self) {
        let states = self.tasks.values().map(|t| &t.state);
        self.state.update_counts(states);
    }

    /// Depth-first topological sort seeded in registration order
    fn topological_sort(order: &[String], tasks: &HashMap<String, Task>) -> Result<Vec<String>, ReleaseError> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut temp_visited = HashSet::new();

        for task_id in order {
            if !visited.contains(task_id) {
                Self::visit(task_id, tasks, &mut visited, &mut temp_visited, &mut result)?;
            }
        }

        Ok(result)
    }

    fn visit(
        task_id: &str,
        tasks: &HashMap<String, Task>,
        visited: &mut HashSet<String>,
        temp_visited: &mut HashSet<String>,
        result: &mut Vec<String>,
    ) -> Result<(), ReleaseError> {
        if visited.contains(task_id) {
            return Ok(());
        }
        if !temp_visited.insert(task_id.to_string()) {
            return Err(ReleaseError::InvalidGraph(format!(
                "Cycle detected in dependency graph involving task '{}'",
                task_id
            )));
        }

        if let Some(task) = tasks.get(task_id) {
            for dep in &task.dependencies {
                Self::visit(dep, tasks, visited, temp_visited, result)?;
            }
        }

        temp_visited.remove(task_id);
        visited.insert(task_id.to_string());
        result.push(task_id.to_string());
        Ok(())
    }
}
