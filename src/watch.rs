//! Continuous mirroring of a watched tree.
//!
//! A notify watcher produces changed paths into an unbounded channel; a single
//! consumer owns the pending set and the debounce deadline. Producers never
//! wait on the consumer, so events keep accumulating while a copy is running
//! or being retried.
//!
//! ```text
//!  notify thread ──send(path)──▶ channel ──▶ DebouncedCopier
//!                                             pending: BTreeSet<PathBuf>
//!                                             deadline: last event + debounce
//!                                             flush: pop → copy → retry
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use regex::Regex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::copy::Copier;
use crate::entry::{EntryKind, EntryKindFilter};
use crate::error::PluckError;
use crate::results::WatchSummary;

/// Quiet period after the last event before the pending set is drained.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Pause between two attempts at copying the same path.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

const RETRY_LOG_EVERY: u32 = 5;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct WatchConfig {
    pub debounce: Duration,
    pub retry_delay: Duration,
    /// `None` retries a failing path for as long as the watch runs, which
    /// holds up every path queued after it.
    pub max_attempts: Option<u32>,
    /// Changed entries of an excluded kind are dropped at flush time.
    pub kinds: EntryKindFilter,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce:     DEFAULT_DEBOUNCE,
            retry_delay:  DEFAULT_RETRY_DELAY,
            max_attempts: None,
            kinds:        EntryKindFilter::all(),
        }
    }
}

// ---------------------------------------------------------------------------
// CopyTarget
// ---------------------------------------------------------------------------

/// Performs the copy of one changed path.
///
/// Called from a blocking thread, one path at a time.
pub trait CopyTarget: Send + Sync + 'static {
    fn copy_entry(&self, path: &Path) -> Result<(), PluckError>;
}

impl CopyTarget for Copier {
    fn copy_entry(&self, path: &Path) -> Result<(), PluckError> {
        self.copy(path)
    }
}

// ---------------------------------------------------------------------------
// DebouncedCopier
// ---------------------------------------------------------------------------

/// The consumer side of the watch pipeline.
pub struct DebouncedCopier<T> {
    target:  Arc<T>,
    config:  WatchConfig,
    summary: WatchSummary,
}

enum Step {
    Event(Option<PathBuf>),
    Flush,
    Stop,
}

impl<T: CopyTarget> DebouncedCopier<T> {
    pub fn new(target: T, config: WatchConfig) -> Self {
        Self {
            target: Arc::new(target),
            config,
            summary: WatchSummary::default(),
        }
    }

    /// Consume `events` until `cancel` fires or every sender is gone.
    ///
    /// Each event (re)arms the debounce deadline; duplicates collapse in the
    /// pending set. When the channel closes, whatever is still pending is
    /// flushed immediately before returning.
    pub async fn run(
        mut self,
        mut events: UnboundedReceiver<PathBuf>,
        cancel: CancellationToken,
    ) -> WatchSummary {
        let mut pending = BTreeSet::new();
        let mut deadline: Option<Instant> = None;

        loop {
            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => Step::Stop,
                maybe_path = events.recv() => Step::Event(maybe_path),
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => Step::Flush,
            };

            match step {
                Step::Stop => break,
                Step::Event(Some(path)) => {
                    pending.insert(path);
                    deadline = Some(Instant::now() + self.config.debounce);
                }
                Step::Event(None) => {
                    if !pending.is_empty() {
                        self.flush(&mut pending, &mut events, &cancel).await;
                    }
                    break;
                }
                Step::Flush => {
                    deadline = None;
                    if !self.flush(&mut pending, &mut events, &cancel).await {
                        break;
                    }
                }
            }
        }

        debug!(summary = ?self.summary, "watch consumer stopped");
        self.summary
    }

    /// Drain the pending set, folding in anything that arrived meanwhile.
    /// Returns `false` if cancelled part-way.
    async fn flush(
        &mut self,
        pending: &mut BTreeSet<PathBuf>,
        events: &mut UnboundedReceiver<PathBuf>,
        cancel: &CancellationToken,
    ) -> bool {
        self.summary.flush_cycles += 1;
        debug!(pending = pending.len(), "flushing");

        loop {
            while let Ok(path) = events.try_recv() {
                pending.insert(path);
            }
            let Some(path) = pending.pop_first() else {
                return true;
            };

            if self.excluded(&path) {
                debug!(path = %path.display(), "kind excluded; not copying");
                self.summary.discarded += 1;
                continue;
            }

            if !self.copy_with_retry(&path, cancel).await {
                return false;
            }
        }
    }

    fn excluded(&self, path: &Path) -> bool {
        match EntryKind::of(path) {
            Some(EntryKind::File) => !self.config.kinds.includes_files(),
            Some(EntryKind::Dir)  => !self.config.kinds.includes_dirs(),
            _                     => false,
        }
    }

    /// Returns `false` if cancelled while waiting to retry.
    async fn copy_with_retry(&mut self, path: &Path, cancel: &CancellationToken) -> bool {
        let mut attempts: u32 = 0;

        loop {
            match self.attempt(path).await {
                Ok(()) => {
                    info!(path = %path.display(), "copied");
                    self.summary.copied += 1;
                    return true;
                }
                Err(e) if !e.is_transient() => {
                    debug!(path = %path.display(), error = %e, "not copying");
                    self.summary.discarded += 1;
                    return true;
                }
                Err(e) => {
                    attempts += 1;
                    self.summary.failed_attempts += 1;
                    if attempts == 1 || attempts % RETRY_LOG_EVERY == 0 {
                        warn!(path = %path.display(), attempts, error = %e, "copy failed; retrying");
                    }
                    if self.config.max_attempts.is_some_and(|max| attempts >= max) {
                        warn!(path = %path.display(), attempts, "giving up");
                        self.summary.discarded += 1;
                        return true;
                    }
                }
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return false,
                () = sleep(self.config.retry_delay) => {}
            }
        }
    }

    async fn attempt(&self, path: &Path) -> Result<(), PluckError> {
        let target = Arc::clone(&self.target);
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || target.copy_entry(&owned)).await {
            Ok(outcome) => outcome,
            Err(e) => Err(PluckError::io(path, std::io::Error::other(e))),
        }
    }
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

/// Start watching `source` recursively, sending every created, modified or
/// renamed-to path whose full path matches `filter`.
///
/// Deletions are ignored. The returned watcher must be kept alive.
pub fn spawn_watcher(
    source: &Path,
    filter: Regex,
    tx: UnboundedSender<PathBuf>,
) -> Result<RecommendedWatcher, PluckError> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for path in copy_candidates(&event) {
                if filter.is_match(&path.to_string_lossy()) {
                    // Receiver gone means the watch is shutting down
                    let _ = tx.send(path.clone());
                }
            }
        }
        Err(e) => warn!(error = %e, "watcher error"),
    })?;
    watcher.watch(source, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Paths of `event` worth copying.
pub(crate) fn copy_candidates(event: &Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Create(_) => event.paths.as_slice(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => &[],
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1..).unwrap_or(&[])
        }
        EventKind::Modify(_) => event.paths.as_slice(),
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => event.paths.as_slice(),
        _ => &[],
    }
}

/// Watch `source` and mirror matching changes through `target` until
/// `cancel` fires.
///
/// # Errors
///
/// [`PluckError::InvalidWatchRoot`] if `source` or `destination` is not an
/// existing directory, [`PluckError::Watch`] if the watcher cannot start.
pub async fn watch<T: CopyTarget>(
    source: &Path,
    destination: &Path,
    filter: Regex,
    target: T,
    config: WatchConfig,
    cancel: CancellationToken,
) -> Result<WatchSummary, PluckError> {
    for root in [source, destination] {
        if !root.is_dir() {
            return Err(PluckError::InvalidWatchRoot(root.to_path_buf()));
        }
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let _watcher = spawn_watcher(source, filter, tx)?;
    info!(source = %source.display(), destination = %destination.display(), "watch started");
    // Shown whatever the log filter
    eprintln!("{}", startup_line(source, destination));

    Ok(DebouncedCopier::new(target, config).run(rx, cancel).await)
}

fn startup_line(source: &Path, destination: &Path) -> String {
    format!("watch created from {} to {}", source.display(), destination.display())
}
