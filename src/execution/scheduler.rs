//! Execution scheduler - determines which tasks to start next

use crate::core::Pipeline;
use std::fmt;
use std::str::FromStr;

/// Strategy for scheduling task execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingStrategy {
    /// Execute tasks in dependency order, one at a time
    #[default]
    Sequential,

    /// Execute all ready tasks in parallel
    Parallel,

    /// Limited parallelism (max N concurrent tasks)
    LimitedParallel(usize),
}

impl fmt::Display for SchedulingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingStrategy::Sequential => write!(f, "sequential"),
            SchedulingStrategy::Parallel => write!(f, "parallel"),
            SchedulingStrategy::LimitedParallel(n) => write!(f, "parallel-limited({})", n),
        }
    }
}

impl FromStr for SchedulingStrategy {
    type Err = String;

    /// Accepts `sequential`, `parallel`, `parallel-limited` (4) or `parallel-limited=N`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(SchedulingStrategy::Sequential),
            "parallel" => Ok(SchedulingStrategy::Parallel),
            "parallel-limited" => Ok(SchedulingStrategy::LimitedParallel(4)),
            other => match other.strip_prefix("parallel-limited=") {
                Some(n) => n
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .map(SchedulingStrategy::LimitedParallel)
                    .ok_or_else(|| format!("invalid concurrency limit '{}'", n)),
                None => Err(format!("unknown scheduling strategy '{}'", s)),
            },
        }
    }
}

/// Picks the next batch of ready tasks under a strategy
#[derive(Debug, Clone)]
pub struct ExecutionScheduler {
    strategy: SchedulingStrategy,
}

impl ExecutionScheduler {
    pub fn new(strategy: SchedulingStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SchedulingStrategy {
        self.strategy
    }

    /// Get the next batch of tasks to start, in execution order
    pub fn next_tasks(&self, pipeline: &Pipeline) -> Vec<String> {
        let running = pipeline.running_tasks().len();
        let capacity = match self.strategy {
            SchedulingStrategy::Sequential => 1usize.saturating_sub(running),
            SchedulingStrategy::Parallel => usize::MAX,
            SchedulingStrategy::LimitedParallel(max) => max.max(1).saturating_sub(running),
        };

        if capacity == 0 {
            return vec![];
        }

        pipeline
            .ready_tasks()
            .into_iter()
            .take(capacity)
            .map(|t| t.id.clone())
            .collect()
    }
}
