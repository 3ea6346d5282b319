//! Actions behind the tasks of a release run

use crate::command::{CommandResult, CommandRunner, Deferred, Resolver};
use crate::core::{ReleaseContext, ReleaseError, TaskAction, TaskOutcome};
use crate::notes::{self, ReleaseNotes};
use crate::packaging::{Artifact, ManifestValues, Packager};
use crate::publish::{PublishOutcome, PublishRequest, PublishTarget, Publisher};
use crate::release::{files, BuiltArtifact};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs one metadata command and resolves its handle
///
/// Never fails: an unavailable command resolves the handle with the
/// `unknown` sentinel.
pub struct CommandTask {
    runner: Arc<dyn CommandRunner>,
    command_line: Vec<String>,
    resolver: Resolver<CommandResult>,
}

impl CommandTask {
    pub fn new(runner: Arc<dyn CommandRunner>, command_line: Vec<String>, resolver: Resolver<CommandResult>) -> Self {
        Self {
            runner,
            command_line,
            resolver,
        }
    }
}

#[async_trait]
impl TaskAction for CommandTask {
    async fn run(&self) -> Result<TaskOutcome, ReleaseError> {
        let result = self.runner.run(&self.command_line).await;
        let summary = match &result.failure {
            Some(reason) => {
                warn!("Command '{}' unavailable: {}", self.command_line.join(" "), reason);
                format!("{} ({})", result.text, reason)
            }
            None => {
                debug!("Command '{}' produced {} bytes", self.command_line.join(" "), result.text.len());
                result.text.lines().next().unwrap_or_default().to_string()
            }
        };
        self.resolver.resolve(result);
        Ok(TaskOutcome::completed(summary))
    }
}

/// Composes release notes once both command handles resolve
pub struct NotesTask {
    context: Arc<ReleaseContext>,
    resolver: Resolver<Arc<ReleaseNotes>>,
}

impl NotesTask {
    pub fn new(context: Arc<ReleaseContext>, resolver: Resolver<Arc<ReleaseNotes>>) -> Self {
        Self { context, resolver }
    }
}

#[async_trait]
impl TaskAction for NotesTask {
    async fn run(&self) -> Result<TaskOutcome, ReleaseError> {
        let hash = self.context.commit_hash.get().await?;
        let message = self.context.commit_message.get().await?;
        let notes = notes::compose(
            self.context.level,
            &self.context.version_string(),
            &self.context.platform_version,
            &hash,
            &message,
        );
        let summary = format!("{} ({})", notes.version_string, notes.level);
        self.resolver.resolve(Arc::new(notes));
        Ok(TaskOutcome::completed(summary))
    }
}

/// Writes rendered notes to a file
pub struct WriteNotesTask {
    notes: Deferred<Arc<ReleaseNotes>>,
    path: PathBuf,
}

impl WriteNotesTask {
    pub fn new(notes: Deferred<Arc<ReleaseNotes>>, path: PathBuf) -> Self {
        Self { notes, path }
    }
}

#[async_trait]
impl TaskAction for WriteNotesTask {
    async fn run(&self) -> Result<TaskOutcome, ReleaseError> {
        let notes = self.notes.get().await?;
        files::write_file(&self.path, notes.render().as_bytes()).await?;
        Ok(TaskOutcome::completed(format!("wrote {}", self.path.display())))
    }
}

/// Removes stale outputs of earlier runs
pub struct CleanTask {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl CleanTask {
    pub fn new(dir: PathBuf, extensions: Vec<String>) -> Self {
        Self { dir, extensions }
    }
}

#[async_trait]
impl TaskAction for CleanTask {
    async fn run(&self) -> Result<TaskOutcome, ReleaseError> {
        match files::clean_stale(&self.dir, &self.extensions).await? {
            None => Ok(TaskOutcome::skipped(format!("{} does not exist", self.dir.display()))),
            Some(removed) => Ok(TaskOutcome::completed(format!("removed {} stale file(s)", removed.len()))),
        }
    }
}

/// Merges the input archives and stamps the manifest, in memory
pub struct PackageTask {
    context: Arc<ReleaseContext>,
    packager: Arc<Packager>,
    inputs: Vec<PathBuf>,
    title: String,
    platform_key: String,
    file_name: String,
    resolver: Resolver<Arc<BuiltArtifact>>,
}

impl PackageTask {
    pub fn new(
        context: Arc<ReleaseContext>,
        packager: Arc<Packager>,
        inputs: Vec<PathBuf>,
        title: String,
        platform_key: String,
        file_name: String,
        resolver: Resolver<Arc<BuiltArtifact>>,
    ) -> Self {
        Self {
            context,
            packager,
            inputs,
            title,
            platform_key,
            file_name,
            resolver,
        }
    }
}

#[async_trait]
impl TaskAction for PackageTask {
    async fn run(&self) -> Result<TaskOutcome, ReleaseError> {
        let hash = self.context.commit_hash.get().await?;
        let values = ManifestValues {
            title: self.title.clone(),
            platform_key: self.platform_key.clone(),
            platform_version: self.context.platform_version.clone(),
            implementation_version: self.context.version_string(),
            commit_hash: hash.text,
        };

        let packager = self.packager.clone();
        let inputs = self.inputs.clone();
        let (artifact, bytes) = tokio::task::spawn_blocking(move || -> Result<(Artifact, Vec<u8>), ReleaseError> {
            let artifacts = inputs
                .iter()
                .map(|path| Artifact::read(path))
                .collect::<Result<Vec<_>, _>>()?;
            let mut merged = packager.package(&artifacts)?;
            Packager::stamp(&mut merged, &values)?;
            let bytes = merged.to_tar_gz()?;
            Ok((merged, bytes))
        })
        .await
        .map_err(|e| ReleaseError::TaskPanicked(e.to_string()))??;

        let summary = format!("{} ({} entries, {} bytes)", self.file_name, artifact.len(), bytes.len());
        info!("Packaged {}", summary);
        self.resolver.resolve(Arc::new(BuiltArtifact {
            file_name: self.file_name.clone(),
            artifact,
            bytes: Arc::new(bytes),
        }));
        Ok(TaskOutcome::completed(summary))
    }
}

/// Places the packaged artifact in the output directory
pub struct CopyArtifactTask {
    artifact: Deferred<Arc<BuiltArtifact>>,
    dir: PathBuf,
}

impl CopyArtifactTask {
    pub fn new(artifact: Deferred<Arc<BuiltArtifact>>, dir: PathBuf) -> Self {
        Self { artifact, dir }
    }
}

#[async_trait]
impl TaskAction for CopyArtifactTask {
    async fn run(&self) -> Result<TaskOutcome, ReleaseError> {
        let built = self.artifact.get().await?;
        let path = self.dir.join(&built.file_name);
        files::write_file(&path, &built.bytes).await?;
        Ok(TaskOutcome::completed(format!("wrote {}", path.display())))
    }
}

/// Publishes the artifact and notes to a single target
pub struct PublishTask {
    context: Arc<ReleaseContext>,
    publisher: Publisher,
    target: PublishTarget,
    notes: Deferred<Arc<ReleaseNotes>>,
    artifact: Deferred<Arc<BuiltArtifact>>,
}

impl PublishTask {
    pub fn new(
        context: Arc<ReleaseContext>,
        publisher: Publisher,
        target: PublishTarget,
        notes: Deferred<Arc<ReleaseNotes>>,
        artifact: Deferred<Arc<BuiltArtifact>>,
    ) -> Self {
        Self {
            context,
            publisher,
            target,
            notes,
            artifact,
        }
    }
}

#[async_trait]
impl TaskAction for PublishTask {
    async fn run(&self) -> Result<TaskOutcome, ReleaseError> {
        let notes = self.notes.get().await?;
        let built = self.artifact.get().await?;
        let request = PublishRequest::new(
            self.context.version_string(),
            self.context.level,
            notes.render(),
            built.file_name.clone(),
            built.bytes.clone(),
        );

        match self.publisher.publish_one(&request, &self.target).await.into_result(&self.target.name)? {
            PublishOutcome::Published { acknowledgement } => Ok(TaskOutcome::completed(acknowledgement)),
            PublishOutcome::Skipped { reason } => Ok(TaskOutcome::skipped(reason)),
            // into_result maps every failure to an error
            other => Err(ReleaseError::PublishFailed {
                target: self.target.name.clone(),
                cause: format!("unexpected outcome {:?}", other),
            }),
        }
    }
}
