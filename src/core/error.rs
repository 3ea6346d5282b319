//! Error taxonomy for the release pipeline

use crate::command::DeferredError;
use crate::core::version::VersionError;
use crate::packaging::PackagingError;
use thiserror::Error;

/// Errors raised while configuring or running a release pipeline
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// A required configuration property is absent
    #[error("Missing required configuration property '{key}'")]
    ConfigurationMissing { key: String },

    /// The configuration file is malformed or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] VersionError),

    /// The task graph is malformed (duplicate ids, unknown dependencies, cycles)
    #[error("Invalid task graph: {0}")]
    InvalidGraph(String),

    #[error("Packaging failed: {0}")]
    Packaging(#[from] PackagingError),

    /// No credential provider yielded a usable credential for an admitted target
    #[error("No credentials available for publish target '{target}'")]
    CredentialMissing { target: String },

    /// Transport failure or remote rejection while publishing
    #[error("Publishing to '{target}' failed: {cause}")]
    PublishFailed { target: String, cause: String },

    #[error("Deferred value unavailable: {0}")]
    Deferred(#[from] DeferredError),

    #[error("Task timed out after {0} seconds")]
    TaskTimeout(u64),

    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    /// A non-best-effort task failed and the pipeline was aborted
    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<ReleaseError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReleaseError {
    /// Shorthand for a missing configuration key
    pub fn missing(key: impl Into<String>) -> Self {
        ReleaseError::ConfigurationMissing { key: key.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_message() {
        let err = ReleaseError::missing("platform_version");
        assert_eq!(
            err.to_string(),
            "Missing required configuration property 'platform_version'"
        );
    }

    #[test]
    fn test_task_failure_names_task_and_cause() {
        let err = ReleaseError::TaskFailed {
            task: "package".into(),
            source: Box::new(ReleaseError::TaskTimeout(5)),
        };
        assert_eq!(err.to_string(), "Task 'package' failed: Task timed out after 5 seconds");
    }
}
