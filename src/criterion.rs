use std::path::{Path, MAIN_SEPARATOR};

use regex::Regex;

use crate::error::PluckError;

/// How the criterion string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// A literal path or name, tested for existence.
    #[default]
    Exact,

    /// A regex matched against each entry's file name.
    NameRegex,

    /// A regex matched against each entry's full path.
    PathRegex,
}

/// A parsed selection criterion. Immutable once built.
#[derive(Debug, Clone)]
pub enum SelectionCriterion {
    /// Literal path (absolute, or relative to the base directory) or bare name.
    Exact(String),
    NameRegex(Regex),
    PathRegex(Regex),
}

impl SelectionCriterion {
    /// Parse `raw` according to `mode`.
    ///
    /// Literals lose any trailing path separators; regexes are compiled as-is.
    ///
    /// # Errors
    ///
    /// Returns [`PluckError::InvalidPattern`] if a regex mode is requested
    /// and `raw` does not compile.
    pub fn parse(raw: &str, mode: MatchMode) -> Result<Self, PluckError> {
        Ok(match mode {
            MatchMode::Exact     => Self::Exact(trim_separators(raw).to_owned()),
            MatchMode::NameRegex => Self::NameRegex(Regex::new(raw)?),
            MatchMode::PathRegex => Self::PathRegex(Regex::new(raw)?),
        })
    }

    pub fn mode(&self) -> MatchMode {
        match self {
            Self::Exact(_)     => MatchMode::Exact,
            Self::NameRegex(_) => MatchMode::NameRegex,
            Self::PathRegex(_) => MatchMode::PathRegex,
        }
    }

    /// Whether `path` matches a regex criterion.
    ///
    /// Always `false` for [`SelectionCriterion::Exact`], which is resolved
    /// by existence checks rather than matching.
    pub fn is_match(&self, path: &Path) -> bool {
        match self {
            Self::Exact(_) => false,
            Self::NameRegex(re) => path
                .file_name()
                .is_some_and(|name| re.is_match(&name.to_string_lossy())),
            Self::PathRegex(re) => re.is_match(&path.to_string_lossy()),
        }
    }
}

/// Strip trailing separators, keeping a lone root separator intact.
pub(crate) fn trim_separators(raw: &str) -> &str {
    let trimmed = raw.trim_end_matches(|c| c == '/' || c == MAIN_SEPARATOR);
    if trimmed.is_empty() && !raw.is_empty() {
        &raw[..1]
    } else {
        trimmed
    }
}
