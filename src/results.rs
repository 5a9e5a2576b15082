use std::path::PathBuf;
use std::time::Duration;

use crate::error::PluckError;

/// The output of a batch copy.
///
/// A batch never stops at the first failure: every requested entry is
/// attempted and each failure is recorded in `errors`.
#[derive(Debug, Default)]
pub struct BatchResults {
    /// Number of entries the batch was asked to copy.
    pub requested: usize,

    /// Number of requested entries copied completely (including their
    /// contents, when copying recursively).
    pub copied: usize,

    /// One error per entry that was not copied completely.
    /// Use [`PluckError::is_transient`] to tell IO failures from skips.
    pub errors: Vec<PluckError>,

    /// Wall-clock time spent on the batch.
    pub duration: Duration,
}

impl BatchResults {
    /// `true` when every requested entry was copied.
    pub fn all_copied(&self) -> bool {
        self.errors.is_empty() && self.copied == self.requested
    }

    /// Paths that were not copied, in the order they failed.
    pub fn failed_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.errors.iter().filter_map(PluckError::path)
    }

    pub(crate) fn record(&mut self, outcome: Result<(), PluckError>) {
        self.requested += 1;
        match outcome {
            Ok(())  => self.copied += 1,
            Err(e)  => self.errors.push(e),
        }
    }
}

/// Counters from a watch session, returned once it shuts down.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WatchSummary {
    /// Times the debounce window elapsed and the pending set was drained.
    pub flush_cycles: usize,

    /// Paths copied successfully.
    pub copied: usize,

    /// Failed copy attempts, retries included.
    pub failed_attempts: usize,

    /// Paths dropped without a copy: excluded by the kind filter, vanished,
    /// outside the source root, or out of retries.
    pub discarded: usize,
}
