use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::criterion::SelectionCriterion;
use crate::engine::{list_dir, navigate};
use crate::entry::EntryKindFilter;
use crate::traits::Visitor;

// ---------------------------------------------------------------------------
// CandidateSet
// ---------------------------------------------------------------------------

/// Deduplicated paths selected for copying in one invocation.
///
/// Iteration order is sorted, which callers should not rely on beyond
/// "each path exactly once".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    paths: BTreeSet<PathBuf>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the path was already present.
    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.paths.insert(path.into())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }
}

impl IntoIterator for CandidateSet {
    type Item = PathBuf;
    type IntoIter = std::collections::btree_set::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a PathBuf;
    type IntoIter = std::collections::btree_set::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

impl FromIterator<PathBuf> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self { paths: iter.into_iter().collect() }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Where and how deep to look.
#[derive(Debug, Clone, Copy)]
pub struct SelectScope<'a> {
    /// Directory the search starts from.
    pub base_dir: &'a Path,

    /// Search the whole subtree instead of the immediate entries only.
    pub recursive: bool,

    /// Skip exploring directories that were themselves selected.
    ///
    /// Only sound when the copy that follows recurses into every selected
    /// directory; otherwise matches nested under a selected directory are lost.
    pub prune_selected: bool,
}

/// Build the candidate set for `criterion` under `scope`.
pub fn select(
    criterion: &SelectionCriterion,
    filter: EntryKindFilter,
    scope: SelectScope<'_>,
) -> CandidateSet {
    let mut found = CandidateSet::new();

    match criterion {
        SelectionCriterion::Exact(literal) if scope.recursive => {
            let mut visitor = ExactEverywhere { literal, filter, found: &mut found };
            visitor.probe(scope.base_dir);
            navigate(scope.base_dir, &mut visitor);
        }
        SelectionCriterion::Exact(literal) => {
            if let Some(hit) = resolve_exact(literal, scope.base_dir, filter) {
                found.insert(hit);
            }
        }
        _ if scope.recursive => {
            let mut visitor = RegexWalk {
                criterion,
                filter,
                prune_selected: scope.prune_selected,
                found: &mut found,
            };
            navigate(scope.base_dir, &mut visitor);
        }
        _ => {
            let listing = list_dir(scope.base_dir);
            if filter.includes_files() {
                found.extend_matching(listing.files, criterion);
            }
            if filter.includes_dirs() {
                found.extend_matching(listing.dirs, criterion);
            }
        }
    }

    debug!(
        base = %scope.base_dir.display(),
        recursive = scope.recursive,
        selected = found.len(),
        "selection complete"
    );
    found
}

impl CandidateSet {
    fn extend_matching(&mut self, paths: Vec<PathBuf>, criterion: &SelectionCriterion) {
        self.paths
            .extend(paths.into_iter().filter(|p| criterion.is_match(p)));
    }
}

/// An absolute literal is tried as-is; anything else, or an absolute literal
/// that does not pass the filter, is retried under `base_dir`.
fn resolve_exact(literal: &str, base_dir: &Path, filter: EntryKindFilter) -> Option<PathBuf> {
    let direct = Path::new(literal);
    if direct.is_absolute() && filter.accepts(direct) {
        return Some(direct.to_path_buf());
    }
    let joined = base_dir.join(literal);
    filter.accepts(&joined).then_some(joined)
}

// ---------------------------------------------------------------------------
// Visitors
// ---------------------------------------------------------------------------

/// Looks for `literal` inside every directory of the subtree.
struct ExactEverywhere<'a> {
    literal: &'a str,
    filter:  EntryKindFilter,
    found:   &'a mut CandidateSet,
}

impl ExactEverywhere<'_> {
    fn probe(&mut self, dir: &Path) {
        let candidate = dir.join(self.literal);
        if self.filter.accepts(&candidate) {
            self.found.insert(candidate);
        }
    }
}

impl Visitor for ExactEverywhere<'_> {
    fn should_consider_dir(&mut self, _dir: &Path) -> bool {
        true
    }

    fn on_dir(&mut self, dir: &Path) {
        self.probe(dir);
    }
}

/// Matches every file and directory of the subtree against a regex.
struct RegexWalk<'a> {
    criterion:      &'a SelectionCriterion,
    filter:         EntryKindFilter,
    prune_selected: bool,
    found:          &'a mut CandidateSet,
}

impl Visitor for RegexWalk<'_> {
    fn should_explore(&mut self, dir: &Path) -> bool {
        // The copy will recurse into a selected directory anyway
        !(self.prune_selected && self.found.contains(dir))
    }

    fn should_consider_dir(&mut self, dir: &Path) -> bool {
        self.filter.includes_dirs() && self.criterion.is_match(dir)
    }

    fn on_dir(&mut self, dir: &Path) {
        self.found.insert(dir);
    }

    fn should_consider_file(&mut self, file: &Path) -> bool {
        self.filter.includes_files() && self.criterion.is_match(file)
    }

    fn on_file(&mut self, file: &Path) {
        self.found.insert(file);
    }
}
