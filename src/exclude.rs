//! Directory exclusion: `-e REGEX` / `-E NAME` / `-Z` (shorthand for
//! `-E .snapshot`). The two flavours are mutually exclusive at parse time;
//! once built the set is immutable for the run.

use regex::Regex;

use crate::error::ChownError;

#[derive(Debug, Clone)]
pub enum ExcludePattern {
    Literal(String),
    Regex(Regex),
}

impl ExcludePattern {
    #[must_use]
    pub fn matches(&self, basename: &str) -> bool {
        match self {
            Self::Literal(name) => name == basename,
            Self::Regex(re) => re.is_match(basename),
        }
    }
}

/// Compiles `-e` patterns into [`ExcludePattern::Regex`] entries.
///
/// # Errors
/// Returns [`ChownError::UsageError`] if any pattern fails to compile.
pub fn compile_regexes(patterns: &[String]) -> Result<Vec<ExcludePattern>, ChownError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p)
                .map(ExcludePattern::Regex)
                .map_err(|e| ChownError::UsageError(format!("bad exclude regex {p:?}: {e}")))
        })
        .collect()
}

/// Wraps `-E` literal names (and `-Z`'s `.snapshot`) as exact-match patterns.
#[must_use]
pub fn literals(names: &[String]) -> Vec<ExcludePattern> {
    names.iter().cloned().map(ExcludePattern::Literal).collect()
}

#[must_use]
pub fn any_matches(patterns: &[ExcludePattern], basename: &str) -> bool {
    patterns.iter().any(|p| p.matches(basename))
}
