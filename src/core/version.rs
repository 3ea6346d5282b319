//! Version specification and release level classification

use crate::core::condition::ConditionPattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("base version is empty")]
    EmptyBase,

    #[error("base version '{0}' must be dot-separated non-negative integers")]
    MalformedBase(String),

    #[error("version suffix must not be empty")]
    EmptySuffix,
}

/// An immutable version: dotted numeric base plus an optional suffix tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpec {
    base: String,
    components: Vec<u64>,
    suffix: Option<String>,
}

impl VersionSpec {
    /// Create a version spec, validating the base and suffix
    pub fn new(base: impl Into<String>, suffix: Option<String>) -> Result<Self, VersionError> {
        let base = base.into();
        let trimmed = base.trim();
        if trimmed.is_empty() {
            return Err(VersionError::EmptyBase);
        }

        let components = trimmed
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(VersionError::MalformedBase(trimmed.to_string()));
                }
                part.parse::<u64>()
                    .map_err(|_| VersionError::MalformedBase(trimmed.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(ref s) = suffix {
            if s.trim().is_empty() {
                return Err(VersionError::EmptySuffix);
            }
        }

        Ok(Self {
            base: trimmed.to_string(),
            components,
            suffix: suffix.map(|s| s.trim().to_string()),
        })
    }

    /// Parse `base` or `base-suffix`; the suffix starts at the first `-`
    pub fn parse(version: &str) -> Result<Self, VersionError> {
        match version.split_once('-') {
            Some((base, suffix)) => Self::new(base, Some(suffix.to_string())),
            None => Self::new(version, None),
        }
    }

    pub fn base_version(&self) -> &str {
        &self.base
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    pub fn major(&self) -> u64 {
        self.components.first().copied().unwrap_or(0)
    }

    /// The full version string, `base` or `base-suffix`
    pub fn version_string(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}-{}", self.base, suffix),
            None => self.base.clone(),
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version_string())
    }
}

/// How stable or public a build is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseLevel {
    Release,
    ReleaseCandidate,
    Beta,
    Alpha,
    Snapshot,
}

impl ReleaseLevel {
    /// Human-readable level name, used verbatim in release notes
    pub fn name(&self) -> &'static str {
        match self {
            ReleaseLevel::Release => "Release",
            ReleaseLevel::ReleaseCandidate => "Release Candidate",
            ReleaseLevel::Beta => "Beta",
            ReleaseLevel::Alpha => "Alpha",
            ReleaseLevel::Snapshot => "Snapshot",
        }
    }

    /// Short channel tag sent to publish targets
    pub fn tag(&self) -> &'static str {
        match self {
            ReleaseLevel::Release => "release",
            ReleaseLevel::ReleaseCandidate => "rc",
            ReleaseLevel::Beta => "beta",
            ReleaseLevel::Alpha => "alpha",
            ReleaseLevel::Snapshot => "snapshot",
        }
    }

    pub fn all() -> &'static [ReleaseLevel] {
        &[
            ReleaseLevel::Release,
            ReleaseLevel::ReleaseCandidate,
            ReleaseLevel::Beta,
            ReleaseLevel::Alpha,
            ReleaseLevel::Snapshot,
        ]
    }
}

impl fmt::Display for ReleaseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A suffix rule: when the pattern matches, the build gets `level`
#[derive(Debug, Clone)]
pub struct LevelRule {
    pub pattern: ConditionPattern,
    pub level: ReleaseLevel,
}

/// Ordered classification rules
///
/// Suffix rules are evaluated first and the first match wins. The structural
/// fallback on the base version only applies when there is no suffix.
#[derive(Debug, Clone)]
pub struct LevelRules {
    pub rules: Vec<LevelRule>,

    /// Level for a suffix that no rule recognises
    pub unmatched_suffix: ReleaseLevel,

    /// Level for a suffix-less version with major component 0
    pub zero_major: ReleaseLevel,

    /// Level for any other suffix-less version
    pub stable: ReleaseLevel,
}

impl LevelRules {
    pub fn classify(&self, spec: &VersionSpec) -> ReleaseLevel {
        if let Some(suffix) = spec.suffix() {
            return self
                .rules
                .iter()
                .find(|rule| rule.pattern.matches(suffix))
                .map(|rule| rule.level)
                .unwrap_or(self.unmatched_suffix);
        }

        if spec.major() == 0 {
            self.zero_major
        } else {
            self.stable
        }
    }
}

impl Default for LevelRules {
    fn default() -> Self {
        let simple = |s: &str, level| LevelRule {
            pattern: ConditionPattern::Simple(s.to_string()),
            level,
        };
        let mut rules = vec![
            simple("snapshot", ReleaseLevel::Snapshot),
            simple("alpha", ReleaseLevel::Alpha),
            simple("beta", ReleaseLevel::Beta),
        ];
        if let Ok(rc) = ConditionPattern::new(r"(?i)^(rc|pre)", true) {
            rules.push(LevelRule {
                pattern: rc,
                level: ReleaseLevel::ReleaseCandidate,
            });
        }

        Self {
            rules,
            unmatched_suffix: ReleaseLevel::Snapshot,
            zero_major: ReleaseLevel::Beta,
            stable: ReleaseLevel::Release,
        }
    }
}

/// Classify with the default rules
pub fn classify(spec: &VersionSpec) -> ReleaseLevel {
    LevelRules::default().classify(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(base: &str, suffix: Option<&str>) -> VersionSpec {
        VersionSpec::new(base, suffix.map(str::to_string)).unwrap()
    }

    #[test]
    fn test_parse_version_string() {
        let v = VersionSpec::parse("1.2.3-beta-3").unwrap();
        assert_eq!(v.base_version(), "1.2.3");
        assert_eq!(v.suffix(), Some("beta-3"));
        assert_eq!(v.version_string(), "1.2.3-beta-3");
        assert_eq!(v.components(), &[1, 2, 3]);
    }

    #[test]
    fn test_invalid_versions() {
        assert_eq!(VersionSpec::new("", None), Err(VersionError::EmptyBase));
        assert!(matches!(VersionSpec::new("1..2", None), Err(VersionError::MalformedBase(_))));
        assert!(matches!(VersionSpec::new("1.x", None), Err(VersionError::MalformedBase(_))));
        assert!(matches!(VersionSpec::new("-1.0", None), Err(VersionError::MalformedBase(_))));
        assert_eq!(
            VersionSpec::new("1.0", Some("  ".to_string())),
            Err(VersionError::EmptySuffix)
        );
    }

    #[test]
    fn test_suffix_overrides_structure() {
        assert_eq!(classify(&spec("2.0.0", Some("beta-3"))), ReleaseLevel::Beta);
        assert_eq!(classify(&spec("0.9", Some("RC2"))), ReleaseLevel::ReleaseCandidate);
        assert_eq!(classify(&spec("3.1", Some("SNAPSHOT"))), ReleaseLevel::Snapshot);
        assert_eq!(classify(&spec("3.1", Some("alpha.1"))), ReleaseLevel::Alpha);
    }

    #[test]
    fn test_unknown_suffix_falls_back_to_most_conservative() {
        assert_eq!(classify(&spec("5.0.0", Some("weird-tag"))), ReleaseLevel::Snapshot);
    }

    #[test]
    fn test_structural_classification_without_suffix() {
        assert_eq!(classify(&spec("1.2.3", None)), ReleaseLevel::Release);
        assert_eq!(classify(&spec("0.4.1", None)), ReleaseLevel::Beta);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let v = spec("2.1.0", Some("pre4"));
        let first = classify(&v);
        for _ in 0..10 {
            assert_eq!(classify(&v), first);
        }
    }

    #[test]
    fn test_custom_rules_first_match_wins() {
        let rules = LevelRules {
            rules: vec![
                LevelRule {
                    pattern: ConditionPattern::Simple("beta".into()),
                    level: ReleaseLevel::Alpha,
                },
                LevelRule {
                    pattern: ConditionPattern::Simple("beta".into()),
                    level: ReleaseLevel::Beta,
                },
            ],
            unmatched_suffix: ReleaseLevel::Alpha,
            zero_major: ReleaseLevel::Snapshot,
            stable: ReleaseLevel::Release,
        };
        assert_eq!(rules.classify(&spec("1.0", Some("beta"))), ReleaseLevel::Alpha);
        assert_eq!(rules.classify(&spec("0.1", None)), ReleaseLevel::Snapshot);
    }

    #[test]
    fn test_level_names_and_tags() {
        assert_eq!(ReleaseLevel::ReleaseCandidate.to_string(), "Release Candidate");
        assert_eq!(ReleaseLevel::ReleaseCandidate.tag(), "rc");
        assert_eq!(ReleaseLevel::all().len(), 5);
    }
}
