//! Artifact merging, namespace relocation and manifest stamping

pub mod archive;
pub mod class_file;
pub mod manifest;
pub mod packager;
pub mod relocate;

pub use archive::{ArchiveEntry, Artifact};
pub use manifest::Manifest;
pub use packager::{ManifestValues, PackageRules, Packager};
pub use relocate::{Relocation, Relocator};

use thiserror::Error;

/// Errors raised while reading, merging or writing artifacts
#[derive(Debug, Error)]
pub enum PackagingError {
    /// Two entries resolve to the same path after relocation
    #[error("entry '{path}' from '{second}' collides with the same path from '{first}'")]
    Conflict {
        path: String,
        first: String,
        second: String,
    },

    #[error("malformed class file '{path}': {reason}")]
    MalformedClass { path: String, reason: String },

    /// A required manifest key has no source value
    #[error("manifest key '{0}' has no value")]
    MissingManifestValue(String),

    #[error("invalid relocation '{from}' -> '{to}': {reason}")]
    InvalidRelocation {
        from: String,
        to: String,
        reason: String,
    },

    #[error("invalid exclusion pattern '{pattern}': {reason}")]
    InvalidExclusion { pattern: String, reason: String },

    #[error("archive IO error: {0}")]
    Io(#[from] std::io::Error),
}
