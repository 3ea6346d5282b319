//! Release configuration from YAML

use crate::core::condition::ConditionPattern;
use crate::core::error::ReleaseError;
use crate::core::properties::{keys, placeholders, Properties};
use crate::core::version::{LevelRule, LevelRules, ReleaseLevel};
use crate::packaging::packager::{DEFAULT_CONTENT_EXTENSIONS, DEFAULT_PLATFORM_KEY};
use crate::packaging::{PackageRules, Packager, Relocation};
use crate::publish::{
    CredentialProvider, KeyedCredentials, MarketplaceSink, MavenRepositorySink, PublishError, PublishGate,
    PublishSink, PublishTarget, DEFAULT_HTTP_TIMEOUT_SECS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Top-level release configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Project name
    pub name: String,

    /// Directory commands run in and relative paths resolve against
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Build properties (overridable with `-P key=value`)
    #[serde(default)]
    pub properties: Properties,

    /// Extra properties that must be set before anything runs
    #[serde(default)]
    pub required_properties: Vec<String>,

    #[serde(default)]
    pub levels: LevelsConfig,

    #[serde(default)]
    pub commands: CommandsConfig,

    pub package: PackageConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Publish destinations, tried in order
    #[serde(default)]
    pub publish: Vec<PublishTargetConfig>,

    /// Default timeout for every task (in seconds)
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,

    /// Directory of the file this config was read from
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Version classification rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelsConfig {
    /// Ordered suffix rules; omitted means the built-in rules
    #[serde(default)]
    pub rules: Option<Vec<LevelRuleConfig>>,

    #[serde(default = "default_unmatched_suffix")]
    pub unmatched_suffix: ReleaseLevel,

    #[serde(default = "default_zero_major")]
    pub zero_major: ReleaseLevel,

    #[serde(default = "default_stable")]
    pub stable: ReleaseLevel,
}

impl Default for LevelsConfig {
    fn default() -> Self {
        Self {
            rules: None,
            unmatched_suffix: default_unmatched_suffix(),
            zero_major: default_zero_major(),
            stable: default_stable(),
        }
    }
}

fn default_unmatched_suffix() -> ReleaseLevel {
    ReleaseLevel::Snapshot
}

fn default_zero_major() -> ReleaseLevel {
    ReleaseLevel::Beta
}

fn default_stable() -> ReleaseLevel {
    ReleaseLevel::Release
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelRuleConfig {
    pub pattern: String,

    /// Whether to use regex pattern matching
    #[serde(default)]
    pub use_regex: bool,

    pub level: ReleaseLevel,
}

/// Metadata commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_commit_hash_command")]
    pub commit_hash: Vec<String>,

    #[serde(default = "default_commit_message_command")]
    pub commit_message: Vec<String>,

    #[serde(default = "default_command_timeout")]
    pub timeout_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            commit_hash: default_commit_hash_command(),
            commit_message: default_commit_message_command(),
            timeout_secs: default_command_timeout(),
        }
    }
}

fn default_commit_hash_command() -> Vec<String> {
    ["git", "rev-parse", "--short", "HEAD"].map(String::from).to_vec()
}

fn default_commit_message_command() -> Vec<String> {
    ["git", "log", "-1", "--format=%B"].map(String::from).to_vec()
}

fn default_command_timeout() -> u64 {
    30
}

/// Artifact packaging rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Value of `Implementation-Title`
    pub title: String,

    /// Input archives, merged in order
    pub inputs: Vec<PathBuf>,

    /// Output file name; `{{ key }}` placeholders are filled from properties
    pub file_name: String,

    #[serde(default)]
    pub relocations: Vec<RelocationConfig>,

    /// Glob patterns of entries to drop
    #[serde(default)]
    pub exclusions: Vec<String>,

    #[serde(default)]
    pub content_extensions: Option<Vec<String>>,

    /// Manifest key for the platform version
    #[serde(default = "default_platform_key")]
    pub platform_key: String,
}

fn default_platform_key() -> String {
    DEFAULT_PLATFORM_KEY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocationConfig {
    pub from: String,
    pub to: String,
}

/// Where results are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_changelog_dir")]
    pub changelog_dir: PathBuf,

    /// Extensions removed from `dir` before a run
    #[serde(default = "default_clean_extensions")]
    pub clean_extensions: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            changelog_dir: default_changelog_dir(),
            clean_extensions: default_clean_extensions(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_changelog_dir() -> PathBuf {
    PathBuf::from("changelogs")
}

fn default_clean_extensions() -> Vec<String> {
    ["gz", "jar", "md", "json", "yml"].map(String::from).to_vec()
}

/// A publish destination as written in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishTargetConfig {
    pub name: String,

    #[serde(default)]
    pub gate: PublishGate,

    /// Credential sources, consulted in order
    #[serde(default)]
    pub credentials: Vec<CredentialConfig>,

    /// Per-request HTTP timeout (in seconds)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(flatten)]
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    Maven { url: String },
    Marketplace { url: String, project_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub source: CredentialSource,

    #[serde(default)]
    pub username: Option<String>,

    pub secret: String,
}

/// Which property set a credential is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// Build properties (config file plus CLI overrides)
    Property,
    /// Process environment
    Env,
}

impl ReleaseConfig {
    /// Load release configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReleaseError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse release configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ReleaseError> {
        let config: ReleaseConfig =
            serde_yaml::from_str(yaml).map_err(|e| ReleaseError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration (does not check required properties)
    pub fn validate(&self) -> Result<(), ReleaseError> {
        let invalid = |msg: String| Err(ReleaseError::InvalidConfig(msg));

        if self.name.trim().is_empty() {
            return invalid("name must not be empty".into());
        }
        if self.package.inputs.is_empty() {
            return invalid("package.inputs must list at least one archive".into());
        }
        if self.package.file_name.trim().is_empty() {
            return invalid("package.file_name must not be empty".into());
        }
        if self.commands.commit_hash.is_empty() || self.commands.commit_message.is_empty() {
            return invalid("commands must not be empty".into());
        }

        self.level_rules()?;
        Packager::new(self.package_rules(&Properties::new())?)?;

        let mut names = HashSet::new();
        for target in &self.publish {
            if target.name.trim().is_empty() {
                return invalid("publish target name must not be empty".into());
            }
            if !names.insert(target.name.as_str()) {
                return invalid(format!("Duplicate publish target: {}", target.name));
            }
            if target.credentials.is_empty() {
                return invalid(format!("Publish target '{}' has no credential sources", target.name));
            }
            if target.timeout_secs == Some(0) {
                return invalid(format!("Publish target '{}' has a zero timeout", target.name));
            }
        }

        Ok(())
    }

    /// Apply `key=value` overrides on top of the file's properties
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in overrides {
            self.properties.set(key, value);
        }
    }

    /// Directory relative paths resolve against
    pub fn root_dir(&self) -> PathBuf {
        let base = self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        match &self.working_dir {
            Some(dir) => base.join(dir),
            None => base,
        }
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir().join(path)
        }
    }

    pub fn has_maven_target(&self) -> bool {
        self.publish
            .iter()
            .any(|t| matches!(t.sink, SinkConfig::Maven { .. }))
    }

    /// Every property that must be present, in a stable order
    pub fn required_keys(&self) -> Vec<String> {
        let mut required: Vec<String> = vec![keys::VERSION.into(), keys::PLATFORM_VERSION.into()];
        if self.has_maven_target() {
            required.push(keys::GROUP_ID.into());
            required.push(keys::ARTIFACT_ID.into());
        }
        required.extend(self.required_properties.iter().cloned());
        required.extend(
            placeholders(&self.package.file_name)
                .into_iter()
                .filter(|key| !keys::DERIVED.contains(&key.as_str())),
        );

        let mut seen = HashSet::new();
        required.retain(|k| seen.insert(k.clone()));
        required
    }

    /// Fail with the first missing required property
    pub fn check_required(&self, properties: &Properties) -> Result<(), ReleaseError> {
        for key in self.required_keys() {
            properties.require(&key)?;
        }
        Ok(())
    }

    pub fn level_rules(&self) -> Result<LevelRules, ReleaseError> {
        let mut rules = LevelRules::default();
        if let Some(configured) = &self.levels.rules {
            rules.rules = configured
                .iter()
                .map(|rule| {
                    ConditionPattern::new(&rule.pattern, rule.use_regex)
                        .map(|pattern| LevelRule {
                            pattern,
                            level: rule.level,
                        })
                        .map_err(|e| {
                            ReleaseError::InvalidConfig(format!("Invalid level pattern '{}': {}", rule.pattern, e))
                        })
                })
                .collect::<Result<_, _>>()?;
        }
        rules.unmatched_suffix = self.levels.unmatched_suffix;
        rules.zero_major = self.levels.zero_major;
        rules.stable = self.levels.stable;
        Ok(rules)
    }

    /// Packaging rules; the `norelocate` property turns relocation off
    pub fn package_rules(&self, properties: &Properties) -> Result<PackageRules, ReleaseError> {
        let mut rules = PackageRules::new();
        for relocation in &self.package.relocations {
            rules = rules.with_relocation(Relocation::new(&relocation.from, &relocation.to)?);
        }
        for exclusion in &self.package.exclusions {
            rules = rules.with_exclusion(exclusion.clone());
        }
        let extensions = self
            .package
            .content_extensions
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_EXTENSIONS.iter().map(|e| e.to_string()).collect());
        rules = rules.with_content_extensions(extensions);
        if properties.contains(keys::NO_RELOCATE) {
            rules = rules.without_relocation();
        }
        Ok(rules)
    }

    /// Build publish targets with credential providers over both property sets
    pub fn publish_targets(
        &self,
        properties: Arc<Properties>,
        env: Arc<Properties>,
    ) -> Result<Vec<PublishTarget>, ReleaseError> {
        let mut targets = Vec::with_capacity(self.publish.len());
        let client_error = |e: PublishError| ReleaseError::InvalidConfig(e.to_string());
        for target in &self.publish {
            let timeout = target.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
            let sink: Arc<dyn PublishSink> = match &target.sink {
                SinkConfig::Maven { url } => Arc::new(
                    MavenRepositorySink::new(
                        url.clone(),
                        properties.require(keys::GROUP_ID)?,
                        properties.require(keys::ARTIFACT_ID)?,
                    )
                    .and_then(|sink| sink.with_timeout(timeout))
                    .map_err(client_error)?,
                ),
                SinkConfig::Marketplace { url, project_id } => Arc::new(
                    MarketplaceSink::new(url.clone(), project_id.clone())
                        .and_then(|sink| sink.with_timeout(timeout))
                        .map_err(client_error)?,
                ),
            };

            let mut built = PublishTarget::new(target.name.clone(), sink).with_gate(target.gate.clone());
            for credential in &target.credentials {
                let (source_name, source) = match credential.source {
                    CredentialSource::Property => ("property", properties.clone()),
                    CredentialSource::Env => ("env", env.clone()),
                };
                let provider: Arc<dyn CredentialProvider> = Arc::new(KeyedCredentials::new(
                    source_name,
                    source,
                    credential.username.clone(),
                    credential.secret.clone(),
                ));
                built = built.with_credentials(provider);
            }
            targets.push(built);
        }
        Ok(targets)
    }
}
