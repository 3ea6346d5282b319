//! Pipeline execution engine

pub mod engine;
pub mod executor;
pub mod scheduler;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::{ExecutionResult, TaskExecutor};
pub use scheduler::{ExecutionScheduler, SchedulingStrategy};
