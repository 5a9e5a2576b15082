use std::path::Path;

/// Drives a [`navigate`](crate::engine::navigate) walk.
///
/// Exploration and selection are independent: a directory can be descended
/// into without being reported through [`on_dir`](Visitor::on_dir), and a
/// directory can be reported without being descended into.
///
/// Methods take `&mut self` so a visitor can accumulate whatever it finds
/// (see [`CandidateSet`](crate::CandidateSet)) without interior mutability.
///
/// # Example
///
/// ```rust
/// use std::path::{Path, PathBuf};
/// use pluck::Visitor;
///
/// struct RustFiles(Vec<PathBuf>);
///
/// impl Visitor for RustFiles {
///     fn should_explore(&mut self, dir: &Path) -> bool {
///         dir.file_name().map_or(true, |n| n != "target")
///     }
///
///     fn should_consider_file(&mut self, file: &Path) -> bool {
///         file.extension().is_some_and(|e| e == "rs")
///     }
///
///     fn on_file(&mut self, file: &Path) {
///         self.0.push(file.to_path_buf());
///     }
/// }
/// ```
pub trait Visitor {
    /// Whether the walk should descend into `dir`.
    fn should_explore(&mut self, _dir: &Path) -> bool {
        true
    }

    /// Whether `dir` should be reported through [`on_dir`](Visitor::on_dir).
    fn should_consider_dir(&mut self, _dir: &Path) -> bool {
        false
    }

    fn on_dir(&mut self, _dir: &Path) {}

    /// Whether `file` should be reported through [`on_file`](Visitor::on_file).
    fn should_consider_file(&mut self, _file: &Path) -> bool {
        false
    }

    fn on_file(&mut self, _file: &Path) {}
}

/// Decides whether an existing destination file may be replaced.
///
/// Any `Fn(&Path) -> bool` is a policy, so `&|_: &Path| true` overwrites
/// everything.
pub trait OverwritePolicy: Send + Sync {
    fn should_overwrite(&self, target: &Path) -> bool;
}

impl<F> OverwritePolicy for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn should_overwrite(&self, target: &Path) -> bool {
        self(target)
    }
}

/// Notified after every successful copy with the source and destination paths.
///
/// Called for directories too, once the destination directory exists.
pub trait CopyObserver: Send + Sync {
    fn on_copied(&self, from: &Path, to: &Path);
}

impl<F> CopyObserver for F
where
    F: Fn(&Path, &Path) + Send + Sync,
{
    fn on_copied(&self, from: &Path, to: &Path) {
        self(from, to)
    }
}
