use std::fs;
use std::path::Path;

/// The kind of a filesystem entry.
///
/// Symbolic links are classified by what they point at when probed through
/// [`EntryKind::of`], so a link to a file counts as a file and a link to a
/// directory counts as a directory. `Symlink` only shows up for dangling links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A regular file.
    File,

    /// A directory.
    Dir,

    /// A symbolic link whose target could not be resolved.
    Symlink,

    /// Anything else (device files, pipes, sockets, etc.).
    Other,
}

impl EntryKind {
    /// Probe `path` and return its kind, or `None` when nothing exists there.
    pub fn of(path: &Path) -> Option<Self> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir()  => Some(Self::Dir),
            Ok(meta) if meta.is_file() => Some(Self::File),
            Ok(_)                      => Some(Self::Other),
            Err(_) => match fs::symlink_metadata(path) {
                Ok(meta) if meta.file_type().is_symlink() => Some(Self::Symlink),
                _                                         => None,
            },
        }
    }
}

/// Restricts selection and copy to files, directories, or both.
///
/// At least one kind is always allowed: asking for neither is treated the
/// same as asking for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryKindFilter {
    files: bool,
    dirs:  bool,
}

impl Default for EntryKindFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl EntryKindFilter {
    pub fn new(files: bool, dirs: bool) -> Self {
        if !files && !dirs {
            return Self::all();
        }
        Self { files, dirs }
    }

    pub fn all() -> Self {
        Self { files: true, dirs: true }
    }

    pub fn files_only() -> Self {
        Self { files: true, dirs: false }
    }

    pub fn dirs_only() -> Self {
        Self { files: false, dirs: true }
    }

    pub fn includes_files(&self) -> bool {
        self.files
    }

    pub fn includes_dirs(&self) -> bool {
        self.dirs
    }

    /// Whether an entry of `kind` passes the filter.
    pub fn allows(&self, kind: EntryKind) -> bool {
        match kind {
            EntryKind::File => self.files,
            EntryKind::Dir  => self.dirs,
            _               => false,
        }
    }

    /// Whether `path` exists and its kind passes the filter.
    pub fn accepts(&self, path: &Path) -> bool {
        EntryKind::of(path).is_some_and(|kind| self.allows(kind))
    }
}
