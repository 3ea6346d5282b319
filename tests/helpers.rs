//! Test utility functions for release-pipeline
#![allow(dead_code)]

use async_trait::async_trait;
use release_pipeline::command::{CommandResult, CommandRunner};
use release_pipeline::core::{ExecutionStatus, Pipeline, Properties, ReleaseConfig, ReleaseError, ReleaseLevel};
use release_pipeline::execution::{ExecutionEngine, SchedulingStrategy};
use release_pipeline::packaging::Artifact;
use release_pipeline::publish::{
    Credential, CredentialProvider, KeyedCredentials, PublishError, PublishGate, PublishRequest, PublishSink,
    PublishTarget,
};
use release_pipeline::release::{build_release, ReleaseDeps, ReleaseGraph};
use release_pipeline::report::PipelineReport;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HASH_COMMAND: &str = "git rev-parse --short HEAD";
pub const MESSAGE_COMMAND: &str = "git log -1 --format=%B";

/// Command runner that answers from a table instead of spawning processes
#[derive(Clone, Default)]
pub struct MockCommandRunner {
    outputs: Arc<HashMap<String, String>>,
    calls: Arc<Mutex<Vec<String>>>,
    sequence: Arc<AtomicU64>,
    delay: Option<Duration>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual git answers
    pub fn git(hash: &str, message: &str) -> Self {
        Self::new().with_output(HASH_COMMAND, hash).with_output(MESSAGE_COMMAND, message)
    }

    pub fn with_output(mut self, command_line: &str, output: &str) -> Self {
        Arc::make_mut(&mut self.outputs).insert(command_line.to_string(), output.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, command_line: &[String]) -> CommandResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let joined = command_line.join(" ");
        self.calls.lock().unwrap().push(joined.clone());
        let invoked_at = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        match self.outputs.get(&joined) {
            Some(output) => CommandResult::success(output, invoked_at),
            None => CommandResult::unavailable(format!("{}: command not found", joined), invoked_at),
        }
    }
}

/// What a [`RecordingSink`] received
#[derive(Debug, Clone)]
pub struct RecordedPublish {
    pub version_string: String,
    pub level: ReleaseLevel,
    pub notes: String,
    pub file_name: String,
    pub artifact_len: usize,
    pub credential: Credential,
}

/// Publish sink that keeps requests in memory
#[derive(Clone, Default)]
pub struct RecordingSink {
    received: Arc<Mutex<Vec<RecordedPublish>>>,
    fail_with: Option<u16>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every upload with this status
    pub fn rejecting(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Self::default()
        }
    }

    pub fn received(&self) -> Vec<RecordedPublish> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl PublishSink for RecordingSink {
    fn kind(&self) -> &'static str {
        "recording"
    }

    fn endpoint(&self) -> String {
        "memory://recording".to_string()
    }

    async fn publish(&self, request: &PublishRequest, credential: &Credential) -> Result<String, PublishError> {
        if let Some(status) = self.fail_with {
            return Err(PublishError::Rejected {
                status,
                body: "rejected by test sink".to_string(),
            });
        }
        self.received.lock().unwrap().push(RecordedPublish {
            version_string: request.version_string.clone(),
            level: request.level,
            notes: request.notes.clone(),
            file_name: request.file_name.clone(),
            artifact_len: request.artifact.len(),
            credential: credential.clone(),
        });
        Ok(format!("recorded {}", request.file_name))
    }
}

/// A target over `sink` whose secret is read from `properties` then `env` under `key`
pub fn target(
    name: &str,
    sink: Arc<dyn PublishSink>,
    gate: PublishGate,
    properties: &Properties,
    env: &Properties,
    key: &str,
) -> PublishTarget {
    let from_properties: Arc<dyn CredentialProvider> =
        Arc::new(KeyedCredentials::new("property", Arc::new(properties.clone()), None, key));
    let from_env: Arc<dyn CredentialProvider> =
        Arc::new(KeyedCredentials::new("env", Arc::new(env.clone()), None, key));
    PublishTarget::new(name, sink)
        .with_gate(gate)
        .with_credentials(from_properties)
        .with_credentials(from_env)
}

/// Write a `.tar.gz` input archive
pub fn write_archive(dir: &Path, file_name: &str, entries: Vec<(&str, Vec<u8>)>) -> PathBuf {
    let path = dir.join(file_name);
    Artifact::from_entries(file_name, entries).unwrap().write(&path).unwrap();
    path
}

/// A release config rooted at `dir` with two input archives already written
pub fn release_config(dir: &Path, properties: &[(&str, &str)]) -> ReleaseConfig {
    std::fs::create_dir_all(dir.join("build")).unwrap();
    write_archive(
        &dir.join("build"),
        "core.tar.gz",
        vec![
            ("io/github/nucleus/Nucleus.class", b"core-class".to_vec()),
            ("assets/nucleus/lang.properties", b"greeting=hello".to_vec()),
        ],
    );
    write_archive(
        &dir.join("build"),
        "api.tar.gz",
        vec![("io/github/nucleus/api/NucleusAPI.class", b"api-class".to_vec())],
    );

    let yaml = r#"
name: nucleus
package:
  title: Nucleus
  inputs:
    - build/core.tar.gz
    - build/api.tar.gz
  file_name: "nucleus-{{ version }}.tar.gz"
  platform_key: SpongeAPI-Version
"#;
    let mut config = ReleaseConfig::from_yaml(yaml).unwrap();
    config.base_dir = Some(dir.to_path_buf());
    config.apply_overrides(properties.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    config
}

/// Outcome of running a release graph
pub struct ReleaseRun {
    pub graph_pipeline: Pipeline,
    pub report: PipelineReport,
    pub result: Result<(), ReleaseError>,
    pub notes: Option<String>,
}

impl ReleaseRun {
    pub fn task_outcome(&self, id: &str) -> String {
        self.report
            .task(id)
            .map(|t| t.outcome.clone())
            .unwrap_or_else(|| panic!("no task '{}' in report", id))
    }
}

/// Build and execute a release, then write its report
pub async fn run_release(config: &ReleaseConfig, deps: ReleaseDeps, strategy: SchedulingStrategy) -> ReleaseRun {
    let graph: ReleaseGraph = build_release(config, deps).unwrap();
    let mut pipeline = graph.pipeline;
    let result = ExecutionEngine::new(strategy)
        .with_default_timeout(30)
        .execute(&mut pipeline)
        .await;
    let report = PipelineReport::from_pipeline(&pipeline, graph.context.version_string(), graph.context.level);
    report.write_json(&graph.output_dir).await.unwrap();
    ReleaseRun {
        notes: graph.notes.try_get().map(|n| n.render()),
        graph_pipeline: pipeline,
        report,
        result,
    }
}

pub fn assert_task_outcome(run: &ReleaseRun, id: &str, expected: &str) {
    let actual = run.task_outcome(id);
    assert_eq!(
        actual, expected,
        "task '{}' ended {} (expected {}): {:?}",
        id, actual, expected, run.report.task(id)
    );
}

pub fn assert_pipeline_completed(pipeline: &Pipeline) {
    assert_eq!(
        pipeline.state.status,
        ExecutionStatus::Completed,
        "pipeline did not complete: {:?}",
        pipeline.tasks().map(|t| (&t.id, &t.state)).collect::<Vec<_>>()
    );
}

pub fn assert_pipeline_failed(pipeline: &Pipeline) {
    assert_eq!(pipeline.state.status, ExecutionStatus::Failed);
}
