//! The release task graph
//!
//! [`build_release`] turns a [`ReleaseConfig`] into a [`Pipeline`] whose tasks
//! gather commit metadata, compose notes, package the merged artifact and
//! publish it. Values flow between tasks through [`Deferred`] handles that are
//! wired up here, before anything runs.

pub mod files;
pub mod tasks;

use crate::command::{self, CommandResult, CommandRunner, Deferred};
use crate::core::{Pipeline, Properties, ReleaseConfig, ReleaseContext, ReleaseError, Task};
use crate::notes::ReleaseNotes;
use crate::packaging::{Artifact, Packager};
use crate::publish::{PublishTarget, Publisher};
use std::path::PathBuf;
use std::sync::Arc;
use tasks::{CleanTask, CommandTask, CopyArtifactTask, NotesTask, PackageTask, PublishTask, WriteNotesTask};
use tracing::info;

pub const GIT_HASH: &str = "git_hash";
pub const GIT_COMMIT_MESSAGE: &str = "git_commit_message";
pub const CLEAN_OUTPUTS: &str = "clean_outputs";
pub const RELEASE_NOTES: &str = "release_notes";
pub const WRITE_CHANGELOG: &str = "write_changelog";
pub const OUTPUT_RELEASE_NOTES: &str = "output_release_notes";
pub const PACKAGE: &str = "package";
pub const COPY_ARTIFACT: &str = "copy_artifact";

/// Id of the publish task for a target
pub fn publish_task_id(target: &str) -> String {
    format!("publish:{}", target)
}

/// The packaged artifact, kept in memory until it is placed and published
#[derive(Debug)]
pub struct BuiltArtifact {
    pub file_name: String,
    pub artifact: Artifact,
    pub bytes: Arc<Vec<u8>>,
}

/// Collaborators a release run needs besides its configuration
pub struct ReleaseDeps {
    pub runner: Arc<dyn CommandRunner>,
    /// Fallback credential source
    pub env: Properties,
    /// Overrides the targets built from configuration
    pub targets: Option<Vec<PublishTarget>>,
    pub publisher: Publisher,
    /// Only gather metadata and compose notes
    pub notes_only: bool,
}

impl ReleaseDeps {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            env: Properties::from_process_env(),
            targets: None,
            publisher: Publisher::new(),
            notes_only: false,
        }
    }

    pub fn with_env(mut self, env: Properties) -> Self {
        self.env = env;
        self
    }

    pub fn with_targets(mut self, targets: Vec<PublishTarget>) -> Self {
        self.targets = Some(targets);
        self
    }

    pub fn with_publisher(mut self, publisher: Publisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn notes_only(mut self) -> Self {
        self.notes_only = true;
        self
    }
}

/// A ready-to-run release pipeline and handles to what it produces
pub struct ReleaseGraph {
    pub pipeline: Pipeline,
    pub context: Arc<ReleaseContext>,
    pub notes: Deferred<Arc<ReleaseNotes>>,
    /// Never resolved for a notes-only graph
    pub artifact: Deferred<Arc<BuiltArtifact>>,
    pub output_dir: PathBuf,
}

/// Build the release pipeline
///
/// Fails with `ConfigurationMissing` before any task exists when a required
/// property is absent.
pub fn build_release(config: &ReleaseConfig, deps: ReleaseDeps) -> Result<ReleaseGraph, ReleaseError> {
    config.check_required(&config.properties)?;

    let properties = Arc::new(config.properties.clone());
    let env = Arc::new(deps.env);
    let rules = config.level_rules()?;

    let (hash_resolver, commit_hash) = command::channel::<CommandResult>(GIT_HASH);
    let (message_resolver, commit_message) = command::channel::<CommandResult>(GIT_COMMIT_MESSAGE);
    let context = Arc::new(ReleaseContext::from_properties(
        properties.clone(),
        env.clone(),
        &rules,
        commit_hash,
        commit_message,
    )?);
    info!(
        "Release {} classified as {}",
        context.version_string(),
        context.level
    );

    let (notes_resolver, notes) = command::channel::<Arc<ReleaseNotes>>(RELEASE_NOTES);
    let (artifact_resolver, artifact) = command::channel::<Arc<BuiltArtifact>>(PACKAGE);
    let output_dir = config.resolve_path(&config.output.dir);

    let mut builder = Pipeline::builder(config.name.clone());
    builder
        .register(
            Task::new(
                GIT_HASH,
                Arc::new(CommandTask::new(
                    deps.runner.clone(),
                    config.commands.commit_hash.clone(),
                    hash_resolver,
                )),
            )
            .with_name("Resolve commit hash")
            .best_effort(),
        )
        .register(
            Task::new(
                GIT_COMMIT_MESSAGE,
                Arc::new(CommandTask::new(
                    deps.runner.clone(),
                    config.commands.commit_message.clone(),
                    message_resolver,
                )),
            )
            .with_name("Resolve commit message")
            .best_effort(),
        )
        .register(
            Task::new(RELEASE_NOTES, Arc::new(NotesTask::new(context.clone(), notes_resolver)))
                .with_name("Compose release notes")
                .depends_on(GIT_HASH)
                .depends_on(GIT_COMMIT_MESSAGE),
        );

    if deps.notes_only {
        return Ok(ReleaseGraph {
            pipeline: builder.build()?,
            context,
            notes,
            artifact,
            output_dir,
        });
    }

    let base_version = context.version.base_version().to_string();
    let changelog_dir = config.resolve_path(&config.output.changelog_dir);
    let inputs: Vec<PathBuf> = config.package.inputs.iter().map(|p| config.resolve_path(p)).collect();
    let file_name = context.template_properties().render(&config.package.file_name)?;
    let packager = Arc::new(Packager::new(config.package_rules(&properties)?)?);
    let targets = match deps.targets {
        Some(targets) => targets,
        None => config.publish_targets(properties.clone(), env.clone())?,
    };

    builder
        .register(
            Task::new(
                CLEAN_OUTPUTS,
                Arc::new(CleanTask::new(output_dir.clone(), config.output.clean_extensions.clone())),
            )
            .with_name("Clean stale outputs"),
        )
        .register(
            Task::new(
                WRITE_CHANGELOG,
                Arc::new(WriteNotesTask::new(
                    notes.clone(),
                    files::notes_path(&changelog_dir, &base_version),
                )),
            )
            .with_name("Write changelog")
            .depends_on(RELEASE_NOTES),
        )
        .register(
            Task::new(
                OUTPUT_RELEASE_NOTES,
                Arc::new(WriteNotesTask::new(notes.clone(), files::notes_path(&output_dir, &base_version))),
            )
            .with_name("Write release notes")
            .depends_on(RELEASE_NOTES)
            .depends_on(CLEAN_OUTPUTS),
        )
        .register(
            Task::new(
                PACKAGE,
                Arc::new(PackageTask::new(
                    context.clone(),
                    packager,
                    inputs,
                    config.package.title.clone(),
                    config.package.platform_key.clone(),
                    file_name.clone(),
                    artifact_resolver,
                )),
            )
            .with_name("Package artifact")
            .with_description(format!("writes {}", file_name))
            .depends_on(GIT_HASH),
        )
        .register(
            Task::new(
                COPY_ARTIFACT,
                Arc::new(CopyArtifactTask::new(artifact.clone(), output_dir.clone())),
            )
            .with_name("Copy artifact")
            .depends_on(PACKAGE)
            .depends_on(CLEAN_OUTPUTS),
        );

    for target in targets {
        let id = publish_task_id(&target.name);
        let description = format!("{} ({})", target.sink.kind(), target.sink.endpoint());
        let name = format!("Publish to {}", target.name);
        let action = PublishTask::new(context.clone(), deps.publisher.clone(), target, notes.clone(), artifact.clone());
        builder.register(
            Task::new(id, Arc::new(action))
                .with_name(name)
                .with_description(description)
                .depends_on(PACKAGE)
                .depends_on(RELEASE_NOTES)
                .best_effort(),
        );
    }

    Ok(ReleaseGraph {
        pipeline: builder.build()?,
        context,
        notes,
        artifact,
        output_dir,
    })
}
