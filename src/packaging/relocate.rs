//! Namespace relocation of entry paths and entry contents

use crate::packaging::class_file;
use crate::packaging::PackagingError;
use tracing::debug;

const SERVICES_DIR: &str = "META-INF/services/";

/// Move every reference under package `from` to package `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    from: String,
    to: String,
}

impl Relocation {
    /// Both names may be given dotted (`com.google.gson`) or slashed
    pub fn new(from: &str, to: &str) -> Result<Self, PackagingError> {
        let invalid = |reason: &str| PackagingError::InvalidRelocation {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.to_string(),
        };

        let from_name = normalize(from).ok_or_else(|| invalid("source is not a package name"))?;
        let to_name = normalize(to).ok_or_else(|| invalid("destination is not a package name"))?;
        if from_name == to_name {
            return Err(invalid("source and destination are the same package"));
        }

        Ok(Self {
            from: from_name,
            to: to_name,
        })
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    fn from_internal(&self) -> String {
        self.from.replace('.', "/")
    }

    fn to_internal(&self) -> String {
        self.to.replace('.', "/")
    }
}

fn normalize(name: &str) -> Option<String> {
    let name = name.trim().trim_matches(|c: char| c == '.' || c == '/').replace('/', ".");
    let valid = !name.is_empty()
        && name.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        });
    valid.then_some(name)
}

/// A byte sequence to look for and what to put in its place
#[derive(Debug, Clone)]
struct Needle {
    find: Vec<u8>,
    replace: Vec<u8>,
}

/// Applies a set of relocations to paths and contents
#[derive(Debug, Clone, Default)]
pub struct Relocator {
    /// Most specific (longest source) first
    relocations: Vec<Relocation>,
    /// Longest first so nested packages win over their parents
    needles: Vec<Needle>,
    content_extensions: Vec<String>,
}

impl Relocator {
    pub fn new(mut relocations: Vec<Relocation>, content_extensions: &[String]) -> Self {
        relocations.sort_by(|a, b| b.from.len().cmp(&a.from.len()).then_with(|| a.from.cmp(&b.from)));

        let mut needles = Vec::new();
        for relocation in &relocations {
            let from_internal = relocation.from_internal();
            let to_internal = relocation.to_internal();
            needles.push(Needle {
                find: format!("L{}/", from_internal).into_bytes(),
                replace: format!("L{}/", to_internal).into_bytes(),
            });
            needles.push(Needle {
                find: format!("{}/", from_internal).into_bytes(),
                replace: format!("{}/", to_internal).into_bytes(),
            });
            needles.push(Needle {
                find: format!("{}.", relocation.from).into_bytes(),
                replace: format!("{}.", relocation.to).into_bytes(),
            });
        }
        needles.sort_by(|a, b| b.find.len().cmp(&a.find.len()));

        Self {
            relocations,
            needles,
            content_extensions: content_extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.relocations.is_empty()
    }

    /// Rewrite an entry path, including service registration file names
    pub fn relocate_path(&self, path: &str) -> String {
        if let Some(service) = path.strip_prefix(SERVICES_DIR) {
            for relocation in &self.relocations {
                if let Some(rest) = service.strip_prefix(&format!("{}.", relocation.from)) {
                    return format!("{}{}.{}", SERVICES_DIR, relocation.to, rest);
                }
            }
            return path.to_string();
        }

        for relocation in &self.relocations {
            let prefix = format!("{}/", relocation.from_internal());
            if let Some(rest) = path.strip_prefix(&prefix) {
                return format!("{}/{}", relocation.to_internal(), rest);
            }
        }
        path.to_string()
    }

    /// Rewrite references inside an entry
    ///
    /// Returns `Ok(None)` when the entry should be copied unchanged.
    pub fn relocate_content(&self, path: &str, data: &[u8]) -> Result<Option<Vec<u8>>, PackagingError> {
        if self.is_empty() {
            return Ok(None);
        }

        if path.ends_with(".class") {
            let rewritten = class_file::rewrite_constant_pool(path, data, |s| self.relocate_text(s))?;
            if rewritten.is_some() {
                debug!("Relocated constant pool of {}", path);
            }
            return Ok(rewritten);
        }

        if !self.is_text_entry(path) {
            return Ok(None);
        }
        let Ok(text) = std::str::from_utf8(data) else {
            debug!("Copying non-UTF-8 text entry {} unchanged", path);
            return Ok(None);
        };
        Ok(self.relocate_text(text).map(String::into_bytes))
    }

    /// Service registrations are always text, whatever their name
    fn is_text_entry(&self, path: &str) -> bool {
        if path.starts_with(SERVICES_DIR) {
            return true;
        }
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((_, ext)) => self.content_extensions.contains(&ext.to_ascii_lowercase()),
            None => false,
        }
    }

    /// Rewrite the bounded reference forms inside a string
    ///
    /// A match must start at a token boundary so `xcom/google/` is not mistaken
    /// for `com/google/`. Returns `None` when nothing changed.
    pub fn relocate_text(&self, text: &str) -> Option<String> {
        for relocation in &self.relocations {
            if text == relocation.from {
                return Some(relocation.to.clone());
            }
            if text == relocation.from_internal() {
                return Some(relocation.to_internal());
            }
        }

        let bytes = text.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut changed = false;
        let mut i = 0;
        while i < bytes.len() {
            if i == 0 || !is_name_byte(bytes[i - 1]) {
                if let Some(needle) = self.needles.iter().find(|n| bytes[i..].starts_with(&n.find)) {
                    out.extend_from_slice(&needle.replace);
                    i += needle.find.len();
                    changed = true;
                    continue;
                }
            }
            out.push(bytes[i]);
            i += 1;
        }

        if !changed {
            return None;
        }
        String::from_utf8(out).ok()
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'/' | b'.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packaging::class_file::{build_class, utf8_constants};

    fn relocator() -> Relocator {
        Relocator::new(
            vec![
                Relocation::new("com.google", "io.github.app.lib.google").unwrap(),
                Relocation::new("com.google.gson", "io.github.app.lib.gson").unwrap(),
            ],
            &["properties".to_string(), "MF".to_string()],
        )
    }

    #[test]
    fn test_relocation_validation() {
        assert!(Relocation::new("com/google/gson/", "a.b").is_ok());
        assert_eq!(Relocation::new("com/google/gson", "a.b").unwrap().from(), "com.google.gson");
        assert!(Relocation::new("", "a.b").is_err());
        assert!(Relocation::new("a..b", "c").is_err());
        assert!(matches!(
            Relocation::new("a.b", "a/b"),
            Err(PackagingError::InvalidRelocation { .. })
        ));
    }

    #[test]
    fn test_most_specific_path_relocation_wins() {
        let r = relocator();
        assert_eq!(r.relocate_path("com/google/gson/Gson.class"), "io/github/app/lib/gson/Gson.class");
        assert_eq!(r.relocate_path("com/google/common/Lists.class"), "io/github/app/lib/google/common/Lists.class");
        assert_eq!(r.relocate_path("org/other/X.class"), "org/other/X.class");
        assert_eq!(r.relocate_path("xcom/google/gson/Gson.class"), "xcom/google/gson/Gson.class");
    }

    #[test]
    fn test_service_file_names_are_relocated() {
        let r = relocator();
        assert_eq!(
            r.relocate_path("META-INF/services/com.google.gson.TypeAdapterFactory"),
            "META-INF/services/io.github.app.lib.gson.TypeAdapterFactory"
        );
        assert_eq!(
            r.relocate_path("META-INF/services/org.other.Plugin"),
            "META-INF/services/org.other.Plugin"
        );
    }

    #[test]
    fn test_text_reference_forms() {
        let r = relocator();
        assert_eq!(r.relocate_text("com/google/gson/Gson").as_deref(), Some("io/github/app/lib/gson/Gson"));
        assert_eq!(
            r.relocate_text("(Lcom/google/gson/JsonElement;)V").as_deref(),
            Some("(Lio/github/app/lib/gson/JsonElement;)V")
        );
        assert_eq!(
            r.relocate_text("adapter=com.google.gson.Adapter").as_deref(),
            Some("adapter=io.github.app.lib.gson.Adapter")
        );
        assert_eq!(r.relocate_text("com.google.gson").as_deref(), Some("io.github.app.lib.gson"));
    }

    #[test]
    fn test_matches_require_token_boundary() {
        let r = relocator();
        assert_eq!(r.relocate_text("xcom.google.gson.Foo"), None);
        assert_eq!(r.relocate_text("my/com/google/gson/Foo"), None);
        assert_eq!(r.relocate_text("uses com.googlex.Api"), None);

        // Not gson itself, but still inside the parent package
        assert_eq!(
            r.relocate_text("com.google.gsonx").as_deref(),
            Some("io.github.app.lib.google.gsonx")
        );
        let gson_only = Relocator::new(
            vec![Relocation::new("com.google.gson", "io.github.app.lib.gson").unwrap()],
            &[],
        );
        assert_eq!(gson_only.relocate_text("com.google.gsonx"), None);
        assert_eq!(gson_only.relocate_text("com/google/gsonx/Foo"), None);
    }

    #[test]
    fn test_content_dispatch_by_entry_kind() {
        let r = relocator();
        let class = build_class(&["com/google/gson/Gson"]);
        let rewritten = r.relocate_content("a/A.class", &class).unwrap().unwrap();
        assert_eq!(utf8_constants(&rewritten), vec!["io/github/app/lib/gson/Gson"]);

        let props = r.relocate_content("x.properties", b"k=com.google.gson.X").unwrap();
        assert_eq!(props.as_deref(), Some(&b"k=io.github.app.lib.gson.X"[..]));

        let services = r
            .relocate_content("META-INF/services/com.google.gson.Factory", b"com.google.gson.Impl\n")
            .unwrap();
        assert_eq!(services.as_deref(), Some(&b"io.github.app.lib.gson.Impl\n"[..]));

        // extension not listed: byte copy
        assert_eq!(r.relocate_content("logo.png", b"com.google.gson.X").unwrap(), None);
    }

    #[test]
    fn test_empty_relocator_copies_everything() {
        let r = Relocator::new(Vec::new(), &["properties".to_string()]);
        assert!(r.is_empty());
        assert_eq!(r.relocate_content("bad.class", b"garbage").unwrap(), None);
    }
}
