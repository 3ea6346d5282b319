//! Release context - values shared by every task of one release run

use crate::command::{CommandResult, Deferred};
use crate::core::error::ReleaseError;
use crate::core::properties::{keys, Properties};
use crate::core::version::{LevelRules, ReleaseLevel, VersionSpec};
use std::sync::Arc;

/// Everything task actions read, fixed before any task runs
///
/// The command handles are resolved by the metadata tasks; readers must depend
/// on those tasks before awaiting them.
#[derive(Debug, Clone)]
pub struct ReleaseContext {
    pub version: VersionSpec,
    pub level: ReleaseLevel,
    pub platform_version: String,

    /// Build properties including command-line overrides
    pub properties: Arc<Properties>,

    /// Snapshot of the process environment
    pub env: Arc<Properties>,

    pub commit_hash: Deferred<CommandResult>,
    pub commit_message: Deferred<CommandResult>,
}

impl ReleaseContext {
    /// Derive version and level from the `version` / `version_suffix` properties
    ///
    /// Without a `version_suffix` property the `version` value may carry its own
    /// suffix (`1.2.3-beta-3`).
    pub fn from_properties(
        properties: Arc<Properties>,
        env: Arc<Properties>,
        rules: &LevelRules,
        commit_hash: Deferred<CommandResult>,
        commit_message: Deferred<CommandResult>,
    ) -> Result<Self, ReleaseError> {
        let version = properties.require(keys::VERSION)?;
        let version = match properties.get(keys::VERSION_SUFFIX) {
            Some(suffix) => VersionSpec::new(version, Some(suffix.to_string()))?,
            None => VersionSpec::parse(version)?,
        };
        let platform_version = properties.require(keys::PLATFORM_VERSION)?.to_string();
        let level = rules.classify(&version);

        Ok(Self {
            version,
            level,
            platform_version,
            properties,
            env,
            commit_hash,
            commit_message,
        })
    }

    pub fn version_string(&self) -> String {
        self.version.version_string()
    }

    /// Build properties plus `version_string` and `base_version` for templates
    pub fn template_properties(&self) -> Properties {
        self.properties.with_overlay([
            (keys::VERSION_STRING, self.version_string()),
            (keys::BASE_VERSION, self.version.base_version().to_string()),
        ])
    }
}
