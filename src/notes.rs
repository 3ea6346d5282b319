//! Release note composition

use crate::command::CommandResult;
use crate::core::version::ReleaseLevel;
use serde::{Deserialize, Serialize};

/// Inputs of a rendered release note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNotes {
    pub version_string: String,
    pub platform_version: String,
    pub commit_hash: String,
    pub commit_message: String,
    pub level: ReleaseLevel,
}

/// Combine build metadata into release notes
///
/// Both command results must already have been awaited. A failed command
/// contributes its `unknown` sentinel so the gap is visible in the notes.
pub fn compose(
    level: ReleaseLevel,
    version_string: &str,
    platform_version: &str,
    commit_hash: &CommandResult,
    commit_message: &CommandResult,
) -> ReleaseNotes {
    ReleaseNotes {
        version_string: version_string.to_string(),
        platform_version: platform_version.to_string(),
        commit_hash: commit_hash.text.clone(),
        commit_message: commit_message.text.clone(),
        level,
    }
}

impl ReleaseNotes {
    /// Render the notes with the fixed template
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.version_string));
        out.push_str(&format!("Release level: {}\n", self.level));
        out.push_str(&format!("Target platform version: {}\n", self.platform_version));
        out.push_str(&format!("Commit: {}\n\n", self.commit_hash));
        out.push_str("## Latest change\n\n");
        for line in self.commit_message.lines() {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}
