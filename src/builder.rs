use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::copy::{Copier, CopyStrategy};
use crate::criterion::{trim_separators, MatchMode, SelectionCriterion};
use crate::entry::EntryKindFilter;
use crate::error::PluckError;
use crate::results::{BatchResults, WatchSummary};
use crate::selector::{select, CandidateSet, SelectScope};
use crate::traits::{CopyObserver, OverwritePolicy};
use crate::watch::{self, WatchConfig, DEFAULT_DEBOUNCE, DEFAULT_RETRY_DELAY};

// ---------------------------------------------------------------------------
// JobBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring a select-and-copy job.
///
/// Created via [`pluck::job()`](crate::job). Configure with chained builder
/// methods, then call [`build()`](JobBuilder::build) to validate and resolve
/// the options into a [`Job`].
///
/// # Example
///
/// ```rust,no_run
/// let job = pluck::job()
///     .criterion(r"\.toml$")
///     .name_regex()
///     .source_root("/srv/app")
///     .destination("/backup/app")
///     .recursive_selection(true)
///     .build()?;
///
/// let results = job.run();
/// println!("copied {} of {}", results.copied, results.requested);
/// # Ok::<(), pluck::PluckError>(())
/// ```
pub struct JobBuilder {
    criterion:           Option<String>,
    mode:                MatchMode,
    base_dir:            Option<PathBuf>,
    source_root:         Option<PathBuf>,
    destination:         Option<PathBuf>,
    recursive_selection: bool,
    recursive_copy:      bool,
    kinds:               EntryKindFilter,
    strategy:            CopyStrategy,
    overwrite:           Option<Arc<dyn OverwritePolicy>>,
    observer:            Option<Arc<dyn CopyObserver>>,
    debounce:            Duration,
    retry_delay:         Duration,
    max_attempts:        Option<u32>,
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self {
            criterion:           None,
            mode:                MatchMode::Exact,
            base_dir:            None,
            source_root:         None,
            destination:         None,
            recursive_selection: false,
            recursive_copy:      false,
            kinds:               EntryKindFilter::all(),
            strategy:            CopyStrategy::RootRelative,
            overwrite:           None,
            observer:            None,
            debounce:            DEFAULT_DEBOUNCE,
            retry_delay:         DEFAULT_RETRY_DELAY,
            max_attempts:        None,
        }
    }
}

impl JobBuilder {
    // ── Selection ─────────────────────────────────────────────────────────

    /// Literal path or name, or a regex when combined with
    /// [`name_regex`](Self::name_regex) / [`path_regex`](Self::path_regex).
    pub fn criterion(mut self, raw: impl Into<String>) -> Self {
        self.criterion = Some(raw.into());
        self
    }

    pub fn mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Match the criterion as a regex against entry names.
    pub fn name_regex(self) -> Self {
        self.mode(MatchMode::NameRegex)
    }

    /// Match the criterion as a regex against full entry paths.
    pub fn path_regex(self) -> Self {
        self.mode(MatchMode::PathRegex)
    }

    /// Directory the search starts from. Defaults to the source root.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Search the whole subtree under the base directory.
    pub fn recursive_selection(mut self, yes: bool) -> Self {
        self.recursive_selection = yes;
        self
    }

    pub fn kinds(mut self, kinds: EntryKindFilter) -> Self {
        self.kinds = kinds;
        self
    }

    // ── Copy ──────────────────────────────────────────────────────────────

    /// Root used to compute destination sub-paths. Defaults to the current
    /// directory; relative roots are resolved against it.
    pub fn source_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_root = Some(dir.into());
        self
    }

    pub fn destination(mut self, dir: impl Into<PathBuf>) -> Self {
        self.destination = Some(dir.into());
        self
    }

    /// Copy the contents of selected directories, not just the directories.
    pub fn recursive_copy(mut self, yes: bool) -> Self {
        self.recursive_copy = yes;
        self
    }

    /// Place selected entries directly under the destination by base name.
    pub fn flatten(mut self, yes: bool) -> Self {
        self.strategy = if yes {
            CopyStrategy::Flatten
        } else {
            CopyStrategy::RootRelative
        };
        self
    }

    /// Policy for existing destination files in one-shot runs.
    /// Without one, existing files are left alone. Watch mode always overwrites.
    pub fn overwrite(mut self, policy: impl OverwritePolicy + 'static) -> Self {
        self.overwrite = Some(Arc::new(policy));
        self
    }

    /// Called with `(from, to)` after every successful copy.
    pub fn on_copied(mut self, observer: impl CopyObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    // ── Watch tuning ──────────────────────────────────────────────────────

    /// Quiet period before pending changes are copied. Defaults to 500ms.
    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    /// Pause between attempts at a failing copy. Defaults to 1s.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Give up on a path after `n` failed attempts. Unbounded by default.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n.max(1));
        self
    }

    // ── Build ─────────────────────────────────────────────────────────────

    /// Validate and resolve the options.
    ///
    /// # Errors
    ///
    /// [`PluckError::InvalidConfig`] if the criterion or destination is
    /// missing or the current directory cannot be read,
    /// [`PluckError::InvalidPattern`] if a regex criterion does not compile.
    pub fn build(self) -> Result<Job, PluckError> {
        let raw = self
            .criterion
            .ok_or_else(|| PluckError::InvalidConfig("no criterion provided".into()))?;
        let destination = self
            .destination
            .ok_or_else(|| PluckError::InvalidConfig("no destination provided".into()))?;

        let cwd = std::env::current_dir()
            .map_err(|e| PluckError::InvalidConfig(format!("cannot read current directory: {e}")))?;

        let source_root = match self.source_root {
            Some(root) => absolutize(&cwd, &root),
            None       => cwd.clone(),
        };
        let base_dir = match self.base_dir {
            Some(dir) => absolutize(&cwd, Path::new(trim_separators(&dir.to_string_lossy()))),
            None      => source_root.clone(),
        };
        let destination = absolutize(&cwd, &destination);

        let criterion = SelectionCriterion::parse(&raw, self.mode)?;

        Ok(Job {
            raw_criterion: raw,
            criterion,
            base_dir,
            source_root,
            destination,
            recursive_selection: self.recursive_selection,
            recursive_copy: self.recursive_copy,
            kinds: self.kinds,
            strategy: self.strategy,
            overwrite: self.overwrite,
            observer: self.observer,
            watch: WatchConfig {
                debounce:     self.debounce,
                retry_delay:  self.retry_delay,
                max_attempts: self.max_attempts,
                kinds:        self.kinds,
            },
        })
    }
}

/// `path` made absolute against `cwd`, with `.` and `..` folded away
/// lexically. The path does not need to exist and links are not resolved.
fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            // Popping the root is a no-op, so `/..` stays `/`
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component.as_os_str());
            }
        }
    }
    normalized
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Fully resolved options. Read-only once built.
pub struct Job {
    raw_criterion:       String,
    criterion:           SelectionCriterion,
    base_dir:            PathBuf,
    source_root:         PathBuf,
    destination:         PathBuf,
    recursive_selection: bool,
    recursive_copy:      bool,
    kinds:               EntryKindFilter,
    strategy:            CopyStrategy,
    overwrite:           Option<Arc<dyn OverwritePolicy>>,
    observer:            Option<Arc<dyn CopyObserver>>,
    watch:               WatchConfig,
}

impl Job {
    pub fn criterion(&self) -> &SelectionCriterion {
        &self.criterion
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Build the candidate set without copying anything.
    pub fn select(&self) -> CandidateSet {
        select(
            &self.criterion,
            self.kinds,
            SelectScope {
                base_dir:       &self.base_dir,
                recursive:      self.recursive_selection,
                // Nested matches would be lost if selected dirs are not copied deeply
                prune_selected: self.recursive_copy,
            },
        )
    }

    /// The copier used by one-shot runs.
    pub fn copier(&self) -> Copier {
        Copier::new(&self.source_root, &self.destination)
            .strategy(self.strategy)
            .recurse_contents(self.recursive_copy)
            .shared_overwrite(self.overwrite.clone())
            .shared_observer(self.observer.clone())
    }

    /// Select and copy once.
    pub fn run(&self) -> BatchResults {
        let candidates = self.select();
        let results = self.copier().copy_all(&candidates);
        debug!(
            requested = results.requested,
            copied = results.copied,
            failed = results.errors.len(),
            "run complete"
        );
        results
    }

    /// Mirror matching changes under the source root until `cancel` fires.
    ///
    /// The criterion is used as a regex against full paths whatever the match
    /// mode. Copies are single-level and always overwrite.
    ///
    /// # Errors
    ///
    /// See [`watch::watch`].
    pub async fn watch(&self, cancel: CancellationToken) -> Result<WatchSummary, PluckError> {
        let filter = Regex::new(&self.raw_criterion)?;
        let copier = Copier::new(&self.source_root, &self.destination)
            .strategy(self.strategy)
            .recurse_contents(false)
            .overwrite(|_: &Path| true)
            .shared_observer(self.observer.clone());

        watch::watch(
            &self.source_root,
            &self.destination,
            filter,
            copier,
            self.watch,
            cancel,
        )
        .await
    }

    /// One `key: value` line per resolved option.
    pub fn explain(&self) -> Vec<String> {
        vec![
            format!("criterion: {}", self.raw_criterion),
            format!("mode: {:?}", self.criterion.mode()),
            format!("base directory: {}", self.base_dir.display()),
            format!("source root: {}", self.source_root.display()),
            format!("destination: {}", self.destination.display()),
            format!("recursive selection: {}", self.recursive_selection),
            format!("recursive copy: {}", self.recursive_copy),
            format!(
                "kinds: files={} dirs={}",
                self.kinds.includes_files(),
                self.kinds.includes_dirs()
            ),
            format!("strategy: {:?}", self.strategy),
        ]
    }
}
