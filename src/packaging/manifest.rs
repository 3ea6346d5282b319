//! Archive manifest (`META-INF/MANIFEST.MF` main section)

use std::collections::BTreeMap;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const MANIFEST_VERSION: &str = "Manifest-Version";
const MAX_LINE_BYTES: usize = 72;

/// Key/value metadata stamped into an artifact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    attributes: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse the main section, joining continuation lines
    pub fn parse(text: &str) -> Self {
        let mut logical: Vec<String> = Vec::new();
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                // Only the main section is kept
                break;
            }
            match (line.strip_prefix(' '), logical.last_mut()) {
                (Some(rest), Some(last)) => last.push_str(rest),
                _ => logical.push(line.to_string()),
            }
        }

        let mut manifest = Manifest::new();
        for line in logical {
            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim();
                if key != MANIFEST_VERSION {
                    manifest.set(key, value.trim_start());
                }
            }
        }
        manifest
    }

    /// Render with `Manifest-Version` first and lines wrapped at 72 bytes
    pub fn render(&self) -> String {
        let mut out = String::new();
        push_wrapped(&mut out, &format!("{}: 1.0", MANIFEST_VERSION));
        for (key, value) in &self.attributes {
            push_wrapped(&mut out, &format!("{}: {}", key, value));
        }
        out.push_str("\r\n");
        out
    }
}

fn push_wrapped(out: &mut String, line: &str) {
    let mut budget = MAX_LINE_BYTES;
    let mut current = 0;
    for ch in line.chars() {
        if current + ch.len_utf8() > budget {
            out.push_str("\r\n ");
            // The leading space counts against the continuation line
            budget = MAX_LINE_BYTES - 1;
            current = 0;
        }
        out.push(ch);
        current += ch.len_utf8();
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_and_parse() {
        let mut manifest = Manifest::new();
        manifest.set("Implementation-Title", "Nucleus");
        manifest.set("Git-Hash", "abc123");

        let text = manifest.render();
        assert!(text.starts_with("Manifest-Version: 1.0\r\n"));
        assert_eq!(Manifest::parse(&text), manifest);
    }

    #[test]
    fn test_long_values_wrap_and_rejoin() {
        let mut manifest = Manifest::new();
        let long = "x".repeat(200);
        manifest.set("Long-Value", long.clone());

        let text = manifest.render();
        assert!(text.lines().all(|l| l.len() <= 72));
        assert_eq!(Manifest::parse(&text).get("Long-Value"), Some(long.as_str()));
    }

    #[test]
    fn test_parse_ignores_named_sections() {
        let text = "Manifest-Version: 1.0\nMain-Class: a.B\n\nName: a/B.class\nSHA-256-Digest: zz\n";
        let manifest = Manifest::parse(text);
        assert_eq!(manifest.get("Main-Class"), Some("a.B"));
        assert_eq!(manifest.len(), 1);
    }
}
