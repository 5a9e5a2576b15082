use std::path::{Path, PathBuf};

use ignore::{DirEntry, WalkBuilder};
use tracing::trace;

use crate::entry::EntryKind;
use crate::traits::Visitor;

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Immediate children of one directory, split by kind.
///
/// Both lists keep the order the filesystem enumerated them in.
#[derive(Debug, Default)]
pub struct Listing {
    pub files: Vec<PathBuf>,
    pub dirs:  Vec<PathBuf>,
}

/// Enumerate the immediate children of `dir`.
///
/// Unreadable directories (permission denied, vanished mid-walk) yield an
/// empty listing instead of an error, and individual unreadable entries are
/// dropped. Symbolic links are classified by their target.
pub fn list_dir(dir: &Path) -> Listing {
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .ignore(false)
        .parents(false)
        .hidden(false)
        .follow_links(false)
        .same_file_system(false)
        .max_depth(Some(1))
        .build();

    let mut listing = Listing::default();

    for res in walker {
        let entry = match res {
            Ok(e) => e,
            Err(e) => {
                trace!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };

        // The walker yields the root itself first
        if entry.depth() == 0 {
            continue;
        }

        match classify(&entry) {
            Some(EntryKind::File) => listing.files.push(entry.into_path()),
            Some(EntryKind::Dir)  => listing.dirs.push(entry.into_path()),
            _                     => {}
        }
    }

    listing
}

fn classify(entry: &DirEntry) -> Option<EntryKind> {
    let ft = entry.file_type()?;
    if ft.is_dir() {
        Some(EntryKind::Dir)
    } else if ft.is_file() {
        Some(EntryKind::File)
    } else if ft.is_symlink() {
        EntryKind::of(entry.path())
    } else {
        Some(EntryKind::Other)
    }
}

// ---------------------------------------------------------------------------
// navigate()
// ---------------------------------------------------------------------------

/// Walk the tree under `root`, driving `visitor`.
///
/// In each directory the files are offered first, then each subdirectory in
/// turn: it is offered for selection, and then, if the visitor agrees,
/// explored before moving on to the next one. The walk is therefore
/// depth-first with directories reported before their contents.
///
/// `root` itself is neither offered nor reported. Symbolic links to
/// directories are followed and there is no cycle detection.
pub fn navigate<V: Visitor + ?Sized>(root: &Path, visitor: &mut V) {
    let listing = list_dir(root);

    for file in &listing.files {
        if visitor.should_consider_file(file) {
            visitor.on_file(file);
        }
    }

    for dir in &listing.dirs {
        if visitor.should_consider_dir(dir) {
            visitor.on_dir(dir);
        }
        if visitor.should_explore(dir) {
            navigate(dir, visitor);
        } else {
            trace!(dir = %dir.display(), "not exploring");
        }
    }
}
