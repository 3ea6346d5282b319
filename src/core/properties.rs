//! Key-value property sources (build properties and the process environment)

use crate::core::error::ReleaseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known property keys
pub mod keys {
    pub const VERSION: &str = "version";
    pub const VERSION_SUFFIX: &str = "version_suffix";
    pub const PLATFORM_VERSION: &str = "platform_version";
    pub const GROUP_ID: &str = "group_id";
    pub const ARTIFACT_ID: &str = "artifact_id";
    pub const NO_RELOCATE: &str = "norelocate";

    /// Full version including any suffix, derived per run
    pub const VERSION_STRING: &str = "version_string";
    /// Version without its suffix, derived per run
    pub const BASE_VERSION: &str = "base_version";

    /// Keys computed from other properties rather than configured
    pub const DERIVED: &[&str] = &[VERSION_STRING, BASE_VERSION];
}

/// A flat set of string properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment
    pub fn from_process_env() -> Self {
        std::env::vars().collect()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Get a property; blank values count as absent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Whether the key is present at all, even with a blank value (used for toggles)
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Get a property or fail with `ConfigurationMissing`
    pub fn require(&self, key: &str) -> Result<&str, ReleaseError> {
        self.get(key).ok_or_else(|| ReleaseError::missing(key))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render `{{ key }}` placeholders, failing on the first unresolved one
    ///
    /// Whitespace inside the braces is optional: `{{key}}` and `{{ key }}` are
    /// the same placeholder.
    pub fn render(&self, template: &str) -> Result<String, ReleaseError> {
        let mut rendered = String::with_capacity(template.len());
        for segment in segments(template) {
            match segment {
                Segment::Text(text) => rendered.push_str(text),
                Segment::Key(key) => rendered.push_str(self.require(key)?),
            }
        }
        Ok(rendered)
    }

    /// Copy with extra entries laid over the existing ones
    pub fn with_overlay<I, K, V>(&self, entries: I) -> Properties
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged = self.clone();
        for (key, value) in entries {
            merged.set(key, value);
        }
        merged
    }
}

/// Keys of the `{{ key }}` placeholders in a template, in order of appearance
pub fn placeholders(template: &str) -> Vec<String> {
    segments(template)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Key(key) => Some(key.to_string()),
            Segment::Text(_) => None,
        })
        .collect()
}

enum Segment<'a> {
    Text(&'a str),
    Key(&'a str),
}

/// Split a template into literal text and trimmed placeholder keys
///
/// An unterminated `{{` or an empty `{{ }}` is kept as literal text.
fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else { break };
        let key = after[..end].trim();
        if key.is_empty() {
            out.push(Segment::Text(&rest[..start + 2 + end + 2]));
        } else {
            out.push(Segment::Text(&rest[..start]));
            out.push(Segment::Key(key));
        }
        rest = &after[end + 2..];
    }
    out.push(Segment::Text(rest));
    out
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
