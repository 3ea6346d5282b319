//! In-memory artifacts and their gzip-compressed tar encoding

use crate::packaging::manifest::{Manifest, MANIFEST_PATH};
use crate::packaging::PackagingError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// A single file inside an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub data: Vec<u8>,
}

/// An ordered set of entries plus a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifact {
    /// Label used in diagnostics (usually the source file name)
    name: String,
    entries: Vec<ArchiveEntry>,
    index: HashMap<String, usize>,
    manifest: Manifest,
}

impl Artifact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build an artifact from `(path, bytes)` pairs, rejecting duplicate paths
    pub fn from_entries<P, D>(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (P, D)>,
    ) -> Result<Self, PackagingError>
    where
        P: Into<String>,
        D: Into<Vec<u8>>,
    {
        let mut artifact = Self::new(name);
        for (path, data) in entries {
            artifact.insert(path.into(), data.into())?;
        }
        Ok(artifact)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an entry; an existing path is a conflict, never overwritten
    pub fn insert(&mut self, path: String, data: Vec<u8>) -> Result<(), PackagingError> {
        if self.index.contains_key(&path) {
            return Err(PackagingError::Conflict {
                path,
                first: self.name.clone(),
                second: self.name.clone(),
            });
        }
        self.index.insert(path.clone(), self.entries.len());
        self.entries.push(ArchiveEntry { path, data });
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.index.get(path).map(|&i| self.entries[i].data.as_slice())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    /// SHA-256 over every entry path and content, in entry order
    pub fn content_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.entries {
            hasher.update(entry.path.as_bytes());
            hasher.update([0u8]);
            hasher.update((entry.data.len() as u64).to_be_bytes());
            hasher.update(&entry.data);
        }
        hex::encode(hasher.finalize())
    }

    /// Read a `.tar.gz` artifact from disk
    pub fn read(path: &Path) -> Result<Self, PackagingError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_tar_gz(name, &bytes)
    }

    /// Decode a `.tar.gz` artifact; the manifest entry becomes the manifest
    pub fn from_tar_gz(name: impl Into<String>, bytes: &[u8]) -> Result<Self, PackagingError> {
        let mut artifact = Self::new(name);
        let mut archive = tar::Archive::new(GzDecoder::new(bytes));

        for entry in archive.entries()? {
            let mut entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = entry.path()?.to_string_lossy().replace('\\', "/");
            let path = path.trim_start_matches("./").to_string();

            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;

            if path == MANIFEST_PATH {
                artifact.manifest = Manifest::parse(&String::from_utf8_lossy(&data));
            } else {
                artifact.insert(path, data)?;
            }
        }

        Ok(artifact)
    }

    /// Encode as a reproducible `.tar.gz` with the manifest written first
    pub fn to_tar_gz(&self) -> Result<Vec<u8>, PackagingError> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let manifest = self.manifest.render();
        append_file(&mut builder, MANIFEST_PATH, manifest.as_bytes())?;
        for entry in &self.entries {
            append_file(&mut builder, &entry.path, &entry.data)?;
        }

        let encoder = builder.into_inner()?;
        Ok(encoder.finish()?)
    }

    /// Write the encoded artifact to disk
    pub fn write(&self, path: &Path) -> Result<(), PackagingError> {
        std::fs::write(path, self.to_tar_gz()?)?;
        Ok(())
    }
}

fn append_file<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    path: &str,
    data: &[u8],
) -> Result<(), PackagingError> {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_entry_type(tar::EntryType::Regular);
    builder.append_data(&mut header, path, data)?;
    Ok(())
}
