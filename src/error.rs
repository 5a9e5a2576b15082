use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluckError {
    // Per-entry outcomes
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{} is outside source root {}", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("destination already exists: {}", .0.display())]
    DestinationConflict(PathBuf),

    #[error("IO error at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Config
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("watch root is not a directory: {}", .0.display())]
    InvalidWatchRoot(PathBuf),

    // Runtime
    #[error("watcher error")]
    Watch(#[from] notify::Error),
}

impl PluckError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NotFound(p)
            | Self::DestinationConflict(p)
            | Self::InvalidWatchRoot(p)
            | Self::OutsideRoot { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Whether retrying the same copy later might succeed.
    ///
    /// Only IO failures qualify. A missing source, an entry outside the root
    /// or a declined overwrite will fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

impl From<regex::Error> for PluckError {
    fn from(e: regex::Error) -> Self {
        Self::InvalidPattern(e.to_string())
    }
}
