use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::engine::navigate;
use crate::entry::EntryKind;
use crate::error::PluckError;
use crate::results::BatchResults;
use crate::traits::{CopyObserver, OverwritePolicy, Visitor};

/// Where a copied entry lands under the destination root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyStrategy {
    /// Keep the entry's path relative to the source root.
    #[default]
    RootRelative,

    /// Place the entry directly under the destination by its own name.
    Flatten,
}

// ---------------------------------------------------------------------------
// Copier
// ---------------------------------------------------------------------------

/// Replicates entries from a source root into a destination root.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use pluck::{Copier, CopyStrategy};
///
/// let copier = Copier::new("/srv/site", "/backup/site")
///     .strategy(CopyStrategy::RootRelative)
///     .recurse_contents(true)
///     .overwrite(|_: &Path| true)
///     .observer(|from: &Path, to: &Path| println!("{} -> {}", from.display(), to.display()));
///
/// copier.copy(Path::new("/srv/site/assets"))?;
/// # Ok::<(), pluck::PluckError>(())
/// ```
#[derive(Clone)]
pub struct Copier {
    source_root:      PathBuf,
    destination_root: PathBuf,
    strategy:         CopyStrategy,
    recurse_contents: bool,
    overwrite:        Option<Arc<dyn OverwritePolicy>>,
    observer:         Option<Arc<dyn CopyObserver>>,
}

impl Copier {
    /// A root-relative, non-recursive copier that never overwrites.
    pub fn new(source_root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root:      source_root.into(),
            destination_root: destination_root.into(),
            strategy:         CopyStrategy::RootRelative,
            recurse_contents: false,
            overwrite:        None,
            observer:         None,
        }
    }

    pub fn strategy(mut self, strategy: CopyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Copy the contents of selected directories, not just the directory.
    pub fn recurse_contents(mut self, yes: bool) -> Self {
        self.recurse_contents = yes;
        self
    }

    /// Consulted whenever a destination file already exists. Without a
    /// policy, existing files are never replaced.
    pub fn overwrite(mut self, policy: impl OverwritePolicy + 'static) -> Self {
        self.overwrite = Some(Arc::new(policy));
        self
    }

    pub fn observer(mut self, observer: impl CopyObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub(crate) fn shared_overwrite(mut self, policy: Option<Arc<dyn OverwritePolicy>>) -> Self {
        self.overwrite = policy;
        self
    }

    pub(crate) fn shared_observer(mut self, observer: Option<Arc<dyn CopyObserver>>) -> Self {
        self.observer = observer;
        self
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    // ── Single entry ──────────────────────────────────────────────────────

    /// Copy one entry using the configured strategy.
    pub fn copy(&self, path: &Path) -> Result<(), PluckError> {
        match self.strategy {
            CopyStrategy::RootRelative => self.copy_from_root(path),
            CopyStrategy::Flatten      => self.copy_flattened(path),
        }
    }

    /// Copy `path` to the destination root, keeping its path relative to the
    /// source root.
    ///
    /// # Errors
    ///
    /// - [`PluckError::NotFound`] if `path` is neither a file nor a directory.
    /// - [`PluckError::OutsideRoot`] if `path` is not under the source root
    ///   (compared case-insensitively).
    /// - [`PluckError::DestinationConflict`] if a destination file exists and
    ///   the overwrite policy declines.
    /// - [`PluckError::Io`] for any failure while copying.
    pub fn copy_from_root(&self, path: &Path) -> Result<(), PluckError> {
        self.copy_relative(
            path,
            &self.source_root,
            &self.destination_root,
            self.recurse_contents,
        )
    }

    /// Copy `path` directly under the destination root by its base name.
    ///
    /// The contents of a directory keep their structure below it. Errors are
    /// the same as [`copy_from_root`](Self::copy_from_root), minus `OutsideRoot`.
    pub fn copy_flattened(&self, path: &Path) -> Result<(), PluckError> {
        let kind = existing_kind(path)?;
        let name = path
            .file_name()
            .ok_or_else(|| PluckError::NotFound(path.to_path_buf()))?;
        let target = self.destination_root.join(name);

        match kind {
            EntryKind::Dir => {
                self.make_dir(path, &target)?;
                if self.recurse_contents {
                    self.copy_contents(path, path, &target)?;
                }
                Ok(())
            }
            _ => self.copy_file(path, &target),
        }
    }

    // ── Batch ─────────────────────────────────────────────────────────────

    /// Copy every path, continuing past failures.
    pub fn copy_all<I, P>(&self, paths: I) -> BatchResults
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let start = Instant::now();
        let mut results = BatchResults::default();

        for path in paths {
            let path = path.as_ref();
            let outcome = self.copy(path);
            if let Err(e) = &outcome {
                debug!(path = %path.display(), error = %e, "entry not copied");
            }
            results.record(outcome);
        }

        results.duration = start.elapsed();
        results
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn copy_relative(
        &self,
        path: &Path,
        source_root: &Path,
        destination_root: &Path,
        recurse: bool,
    ) -> Result<(), PluckError> {
        let kind = existing_kind(path)?;
        let sub_path = strip_root(path, source_root).ok_or_else(|| PluckError::OutsideRoot {
            path: path.to_path_buf(),
            root: source_root.to_path_buf(),
        })?;
        let target = if sub_path.as_os_str().is_empty() {
            destination_root.to_path_buf()
        } else {
            destination_root.join(sub_path)
        };

        match kind {
            EntryKind::Dir => {
                self.make_dir(path, &target)?;
                if recurse {
                    self.copy_contents(path, source_root, destination_root)?;
                }
                Ok(())
            }
            _ => self.copy_file(path, &target),
        }
    }

    /// Copy everything below `dir`, each entry one level at a time, relative
    /// to the given roots. Returns the first failure after trying them all.
    fn copy_contents(
        &self,
        dir: &Path,
        source_root: &Path,
        destination_root: &Path,
    ) -> Result<(), PluckError> {
        let mut contents = Contents::default();
        navigate(dir, &mut contents);

        let mut first_error = None;
        for entry in contents.0 {
            if let Err(e) = self.copy_relative(&entry, source_root, destination_root, false) {
                debug!(path = %entry.display(), error = %e, "nested entry not copied");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn make_dir(&self, from: &Path, to: &Path) -> Result<(), PluckError> {
        fs::create_dir_all(to).map_err(|e| PluckError::io(to, e))?;
        self.report(from, to);
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<(), PluckError> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| PluckError::io(parent, e))?;
        }

        if fs::symlink_metadata(to).is_ok() {
            let allowed = self
                .overwrite
                .as_ref()
                .is_some_and(|policy| policy.should_overwrite(to));
            if !allowed {
                return Err(PluckError::DestinationConflict(to.to_path_buf()));
            }
            fs::remove_file(to).map_err(|e| PluckError::io(to, e))?;
        }

        fs::copy(from, to).map_err(|e| PluckError::io(from, e))?;
        self.report(from, to);
        Ok(())
    }

    fn report(&self, from: &Path, to: &Path) {
        trace!(from = %from.display(), to = %to.display(), "copied");
        if let Some(observer) = &self.observer {
            observer.on_copied(from, to);
        }
    }
}

impl std::fmt::Debug for Copier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Copier")
            .field("source_root", &self.source_root)
            .field("destination_root", &self.destination_root)
            .field("strategy", &self.strategy)
            .field("recurse_contents", &self.recurse_contents)
            .field("overwrite", &self.overwrite.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

fn existing_kind(path: &Path) -> Result<EntryKind, PluckError> {
    match EntryKind::of(path) {
        Some(kind @ (EntryKind::File | EntryKind::Dir)) => Ok(kind),
        _ => Err(PluckError::NotFound(path.to_path_buf())),
    }
}

/// Every file and directory below a directory, parents before children.
#[derive(Default)]
struct Contents(Vec<PathBuf>);

impl Visitor for Contents {
    fn should_consider_dir(&mut self, _dir: &Path) -> bool {
        true
    }

    fn on_dir(&mut self, dir: &Path) {
        self.0.push(dir.to_path_buf());
    }

    fn should_consider_file(&mut self, _file: &Path) -> bool {
        true
    }

    fn on_file(&mut self, file: &Path) {
        self.0.push(file.to_path_buf());
    }
}

/// `path` with the `root` prefix removed, comparing components
/// case-insensitively. `None` if `path` is not under `root`.
pub(crate) fn strip_root(path: &Path, root: &Path) -> Option<PathBuf> {
    let mut rest = path.components();
    for root_part in root.components().filter(|c| *c != Component::CurDir) {
        let part = rest.next()?;
        if !same_component(part, root_part) {
            return None;
        }
    }
    Some(rest.as_path().to_path_buf())
}

fn same_component(a: Component<'_>, b: Component<'_>) -> bool {
    let a = a.as_os_str().to_string_lossy();
    let b = b.as_os_str().to_string_lossy();
    a == b || a.to_lowercase() == b.to_lowercase()
}
