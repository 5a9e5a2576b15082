//! # pluck
//!
//! Select filesystem entries and copy them somewhere else.
//!
//! Entries are selected by exact name or path, or by a regex over names or
//! full paths, optionally across a whole subtree. Selected entries are copied
//! either keeping their path relative to a source root, or flattened directly
//! under the destination. A watch mode mirrors matching changes continuously.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! let job = pluck::job()
//!     .criterion("Cargo.toml")
//!     .source_root("/src/workspace")
//!     .destination("/tmp/manifests")
//!     .recursive_selection(true)
//!     .build()?;
//!
//! let results = job.run();
//! assert!(results.all_copied());
//! # Ok::<(), pluck::PluckError>(())
//! ```
//!
//! # Lower-level pieces
//!
//! [`navigate`] walks a tree driven by a [`Visitor`]; [`select`] builds a
//! [`CandidateSet`]; [`Copier`] copies entries one at a time or in batches;
//! [`DebouncedCopier`] is the consumer half of watch mode and can be fed from
//! any channel.
//!
//! ```rust,no_run
//! use std::path::{Path, PathBuf};
//! use pluck::{navigate, Visitor};
//!
//! struct Dirs(Vec<PathBuf>);
//!
//! impl Visitor for Dirs {
//!     fn should_consider_dir(&mut self, _dir: &Path) -> bool { true }
//!     fn on_dir(&mut self, dir: &Path) { self.0.push(dir.to_path_buf()); }
//! }
//!
//! let mut dirs = Dirs(Vec::new());
//! navigate(&std::env::temp_dir(), &mut dirs);
//! ```

#![forbid(unsafe_code)]

pub mod engine;
pub mod watch;

mod builder;
mod copy;
mod criterion;
mod entry;
mod error;
mod results;
mod selector;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::{Job, JobBuilder};
pub use copy::{Copier, CopyStrategy};
pub use criterion::{MatchMode, SelectionCriterion};
pub use engine::navigate;
pub use entry::{EntryKind, EntryKindFilter};
pub use error::PluckError;
pub use results::{BatchResults, WatchSummary};
pub use selector::{select, CandidateSet, SelectScope};
pub use traits::{CopyObserver, OverwritePolicy, Visitor};
pub use watch::{CopyTarget, DebouncedCopier, WatchConfig};

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`JobBuilder`] to configure a select-and-copy job.
pub fn job() -> JobBuilder {
    JobBuilder::default()
}
