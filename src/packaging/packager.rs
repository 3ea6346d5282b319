//! Merging input artifacts into one distributable artifact

use crate::packaging::archive::Artifact;
use crate::packaging::manifest::MANIFEST_PATH;
use crate::packaging::relocate::{Relocation, Relocator};
use crate::packaging::PackagingError;
use glob::Pattern;
use std::collections::HashMap;
use tracing::{debug, info};

/// Extensions whose entries are relocated as text
pub const DEFAULT_CONTENT_EXTENSIONS: &[&str] =
    &["MF", "conf", "properties", "txt", "json", "yml", "yaml", "xml"];

/// Manifest key carrying the target platform version
pub const DEFAULT_PLATFORM_KEY: &str = "Platform-Version";

pub const TITLE_KEY: &str = "Implementation-Title";
pub const VERSION_KEY: &str = "Implementation-Version";
pub const GIT_HASH_KEY: &str = "Git-Hash";
pub const BUILD_DIGEST_KEY: &str = "Build-Digest";

/// Declarative packaging rules
#[derive(Debug, Clone)]
pub struct PackageRules {
    pub relocations: Vec<Relocation>,
    /// Glob patterns over entry paths; matching entries are dropped
    pub exclusions: Vec<String>,
    pub content_extensions: Vec<String>,
    /// When false, paths and contents are copied without relocation
    pub relocate: bool,
}

impl Default for PackageRules {
    fn default() -> Self {
        Self {
            relocations: Vec::new(),
            exclusions: Vec::new(),
            content_extensions: DEFAULT_CONTENT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            relocate: true,
        }
    }
}

impl PackageRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relocation(mut self, relocation: Relocation) -> Self {
        self.relocations.push(relocation);
        self
    }

    pub fn with_exclusion(mut self, pattern: impl Into<String>) -> Self {
        self.exclusions.push(pattern.into());
        self
    }

    pub fn with_content_extensions(mut self, extensions: Vec<String>) -> Self {
        self.content_extensions = extensions;
        self
    }

    pub fn without_relocation(mut self) -> Self {
        self.relocate = false;
        self
    }
}

/// Values stamped into the merged artifact's manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestValues {
    pub title: String,
    pub platform_key: String,
    pub platform_version: String,
    pub implementation_version: String,
    pub commit_hash: String,
}

/// Merges artifacts according to a set of rules
#[derive(Debug, Clone)]
pub struct Packager {
    relocator: Relocator,
    exclusions: Vec<Pattern>,
}

impl Packager {
    pub fn new(rules: PackageRules) -> Result<Self, PackagingError> {
        let exclusions = rules
            .exclusions
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| PackagingError::InvalidExclusion {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let relocations = if rules.relocate { rules.relocations } else { Vec::new() };

        Ok(Self {
            relocator: Relocator::new(relocations, &rules.content_extensions),
            exclusions,
        })
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.exclusions.iter().any(|p| p.matches(path))
    }

    /// Merge inputs in order into a single artifact
    ///
    /// Two entries landing on the same path is a conflict, whichever input
    /// comes first.
    pub fn package(&self, inputs: &[Artifact]) -> Result<Artifact, PackagingError> {
        let mut merged = Artifact::new("merged");
        let mut origins: HashMap<String, &str> = HashMap::new();
        let mut excluded = 0usize;

        for input in inputs {
            for entry in input.entries() {
                if entry.path == MANIFEST_PATH {
                    continue;
                }
                if self.is_excluded(&entry.path) {
                    excluded += 1;
                    continue;
                }

                let path = self.relocator.relocate_path(&entry.path);
                if let Some(first) = origins.get(path.as_str()) {
                    return Err(PackagingError::Conflict {
                        path,
                        first: first.to_string(),
                        second: input.name().to_string(),
                    });
                }
                if path != entry.path {
                    debug!("Relocated {} -> {}", entry.path, path);
                }

                let data = match self.relocator.relocate_content(&entry.path, &entry.data)? {
                    Some(rewritten) => rewritten,
                    None => entry.data.clone(),
                };
                origins.insert(path.clone(), input.name());
                merged.insert(path, data)?;
            }
        }

        info!(
            "Packaged {} entries from {} inputs ({} excluded)",
            merged.len(),
            inputs.len(),
            excluded
        );
        Ok(merged)
    }

    /// Write the required manifest keys plus the content digest
    pub fn stamp(artifact: &mut Artifact, values: &ManifestValues) -> Result<(), PackagingError> {
        let required = [
            (TITLE_KEY, &values.title),
            (values.platform_key.as_str(), &values.platform_version),
            (VERSION_KEY, &values.implementation_version),
            (GIT_HASH_KEY, &values.commit_hash),
        ];
        if values.platform_key.trim().is_empty() {
            return Err(PackagingError::MissingManifestValue("platform key".to_string()));
        }
        for (key, value) in &required {
            if value.trim().is_empty() {
                return Err(PackagingError::MissingManifestValue(key.to_string()));
            }
        }

        let digest = artifact.content_digest();
        let manifest = artifact.manifest_mut();
        for (key, value) in required {
            manifest.set(key, value.trim());
        }
        manifest.set(BUILD_DIGEST_KEY, digest);
        Ok(())
    }
}
