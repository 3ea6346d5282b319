//! Text patterns used by level rules

use regex::{Regex, RegexBuilder};

/// Pattern for matching a version suffix (not serializable due to Regex)
#[derive(Debug, Clone)]
pub enum ConditionPattern {
    /// Case-insensitive substring match
    Simple(String),
    /// Regular expression match, case-insensitive like `Simple`
    Regex(Regex),
}

impl ConditionPattern {
    /// Build a pattern from its configured form
    pub fn new(pattern: &str, use_regex: bool) -> Result<Self, regex::Error> {
        if use_regex {
            let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
            Ok(ConditionPattern::Regex(regex))
        } else {
            Ok(ConditionPattern::Simple(pattern.to_lowercase()))
        }
    }

    /// Check if the pattern matches the given text
    pub fn matches(&self, text: &str) -> bool {
        match self {
            ConditionPattern::Simple(pattern) => text.to_lowercase().contains(pattern.as_str()),
            ConditionPattern::Regex(regex) => regex.is_match(text),
        }
    }

    pub fn display(&self) -> String {
        match self {
            ConditionPattern::Simple(s) => s.clone(),
            ConditionPattern::Regex(r) => format!("[regex: {}]", r.as_str()),
        }
    }
}
