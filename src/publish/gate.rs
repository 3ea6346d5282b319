//! Per-target admission rules

use crate::core::version::ReleaseLevel;
use serde::{Deserialize, Serialize};

/// Decides whether a build may go to a target
///
/// An empty gate admits everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishGate {
    /// Levels admitted; `None` admits every level
    pub levels: Option<Vec<ReleaseLevel>>,
    /// Versions containing this marker (case-insensitive) are refused
    pub version_excludes: Option<String>,
}

impl PublishGate {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn levels(levels: impl IntoIterator<Item = ReleaseLevel>) -> Self {
        Self {
            levels: Some(levels.into_iter().collect()),
            version_excludes: None,
        }
    }

    pub fn excluding_versions(marker: impl Into<String>) -> Self {
        Self {
            levels: None,
            version_excludes: Some(marker.into()),
        }
    }

    /// `Ok(())` when admitted, otherwise the reason the build is refused
    pub fn admit(&self, level: ReleaseLevel, version_string: &str) -> Result<(), String> {
        if let Some(levels) = &self.levels {
            if !levels.contains(&level) {
                let allowed: Vec<&str> = levels.iter().map(|l| l.name()).collect();
                return Err(format!(
                    "level {} is not one of [{}]",
                    level,
                    allowed.join(", ")
                ));
            }
        }

        if let Some(marker) = self.version_excludes.as_deref().filter(|m| !m.is_empty()) {
            if version_string.to_lowercase().contains(&marker.to_lowercase()) {
                return Err(format!("version {} matches excluded marker '{}'", version_string, marker));
            }
        }

        Ok(())
    }
}
