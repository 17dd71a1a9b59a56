//! Exclusion patterns protecting user files during extraction.
//!
//! A pattern is parsed once from a user-supplied string into exactly one of
//! three variants:
//!
//! | Input                          | Variant    |
//! |--------------------------------|------------|
//! | `regex:<re>` / `re:<re>`       | `Regex`    |
//! | `glob:<glob>`                  | `Wildcard` |
//! | contains `^ $ + ( ) { } \|` `\` or `.*` | `Regex` |
//! | contains `*`, `?` or `[`       | `Wildcard` |
//! | anything else                  | `Exact`    |
//!
//! Matching is tested against both the relative path (always `/`-separated)
//! and the base file name.

use std::fmt;

use glob::{MatchOptions, Pattern};
use regex::Regex;

use super::error::{UpdateError, UpdateResult};

const REGEX_META: &[char] = &['^', '$', '+', '(', ')', '{', '}', '|', '\\'];
const WILDCARD_META: &[char] = &['*', '?', '['];

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A parsed exclusion rule.
#[derive(Debug, Clone)]
pub enum ExclusionPattern {
    /// Shell-style wildcard (`*`, `?`, `**`, `[...]`).
    Wildcard(Pattern),
    /// Regular expression.
    Regex(Regex),
    /// Exact file name or relative path.
    Exact(String),
}

impl ExclusionPattern {
    /// Parse a user-configured pattern string.
    pub fn parse(input: &str) -> UpdateResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(UpdateError::InvalidPattern {
                pattern: input.to_string(),
                reason: "empty pattern".to_string(),
            });
        }

        if let Some(re) = trimmed
            .strip_prefix("regex:")
            .or_else(|| trimmed.strip_prefix("re:"))
        {
            return Self::regex(re);
        }
        if let Some(glob) = trimmed.strip_prefix("glob:") {
            return Self::wildcard(glob);
        }

        if trimmed.contains(REGEX_META) || trimmed.contains(".*") {
            Self::regex(trimmed)
        } else if trimmed.contains(WILDCARD_META) {
            Self::wildcard(trimmed)
        } else {
            Ok(Self::Exact(normalize(trimmed)))
        }
    }

    /// Parse a list of patterns, failing on the first invalid one.
    pub fn parse_all<I, S>(inputs: I) -> UpdateResult<Vec<Self>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        inputs
            .into_iter()
            .map(|s| Self::parse(s.as_ref()))
            .collect()
    }

    fn regex(source: &str) -> UpdateResult<Self> {
        Regex::new(source)
            .map(Self::Regex)
            .map_err(|e| UpdateError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })
    }

    fn wildcard(source: &str) -> UpdateResult<Self> {
        Pattern::new(&normalize(source))
            .map(Self::Wildcard)
            .map_err(|e| UpdateError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })
    }

    /// Whether `relative_path` (or its base name) matches this pattern.
    pub fn matches(&self, relative_path: &str) -> bool {
        let path = normalize(relative_path);
        let base = path.rsplit('/').next().unwrap_or(&path);

        match self {
            Self::Wildcard(pattern) => {
                pattern.matches_with(&path, GLOB_OPTIONS) || pattern.matches_with(base, GLOB_OPTIONS)
            }
            Self::Regex(re) => re.is_match(&path) || re.is_match(base),
            Self::Exact(name) => path == *name || base == name,
        }
    }
}

impl fmt::Display for ExclusionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard(p) => write!(f, "glob:{}", p.as_str()),
            Self::Regex(re) => write!(f, "regex:{}", re.as_str()),
            Self::Exact(s) => f.write_str(s),
        }
    }
}

/// Whether any pattern in `patterns` matches `relative_path`.
pub fn is_excluded(patterns: &[ExclusionPattern], relative_path: &str) -> bool {
    patterns.iter().any(|p| p.matches(relative_path))
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches("./").to_string()
}
