//! Core domain models
//!
//! Versions and release levels, properties, configuration, and the task
//! graph the execution engine runs.

pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod properties;
pub mod state;
pub mod task;
pub mod version;

pub use config::ReleaseConfig;
pub use context::ReleaseContext;
pub use error::ReleaseError;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use properties::Properties;
pub use state::{ExecutionStatus, PipelineState, TaskState};
pub use task::{Task, TaskAction, TaskOutcome};
pub use version::{classify, LevelRules, ReleaseLevel, VersionSpec};
