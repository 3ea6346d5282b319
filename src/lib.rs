//! release-pipeline - classify, package and publish release builds

pub mod cli;
pub mod command;
pub mod core;
pub mod execution;
pub mod notes;
pub mod packaging;
pub mod publish;
pub mod release;
pub mod report;

// Re-export commonly used types
pub use crate::command::{CommandResult, CommandRunner, Deferred, SystemCommandRunner};
pub use crate::core::{Pipeline, ReleaseConfig, ReleaseContext, ReleaseError, ReleaseLevel, Task, TaskState, VersionSpec};
pub use crate::execution::{ExecutionEngine, ExecutionEvent, SchedulingStrategy};
pub use crate::notes::ReleaseNotes;
pub use crate::packaging::{Artifact, Packager};
pub use crate::publish::{PublishOutcome, PublishTarget, Publisher};
pub use crate::release::{build_release, ReleaseDeps, ReleaseGraph};
pub use crate::report::PipelineReport;
