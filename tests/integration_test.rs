use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pluck::{
    job, navigate, select, CandidateSet, Copier, CopyStrategy, EntryKindFilter, MatchMode,
    PluckError, SelectScope, SelectionCriterion, Visitor,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory tree for testing.
///
/// Structure:
/// ```
/// tmp/
///   root/
///     file.txt
///     notes.md
///     sub/
///       file.txt
///       deep/
///         file.txt
///         data.csv
///     logs/
///       app.log
///   out/
/// ```
fn setup_test_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");

    fs::create_dir_all(root.join("sub/deep")).unwrap();
    fs::create_dir_all(root.join("logs")).unwrap();
    fs::create_dir_all(dir.path().join("out")).unwrap();

    fs::write(root.join("file.txt"), "top").unwrap();
    fs::write(root.join("notes.md"), "some notes").unwrap();
    fs::write(root.join("sub/file.txt"), "sub").unwrap();
    fs::write(root.join("sub/deep/file.txt"), "deep").unwrap();
    fs::write(root.join("sub/deep/data.csv"), "a,b\n1,2\n").unwrap();
    fs::write(root.join("logs/app.log"), "started").unwrap();

    dir
}

/// Records everything a walk reports, in order.
#[derive(Default)]
struct Recorder {
    visited: Vec<PathBuf>,
}

impl Visitor for Recorder {
    fn should_consider_dir(&mut self, _dir: &Path) -> bool {
        true
    }

    fn on_dir(&mut self, dir: &Path) {
        self.visited.push(dir.to_path_buf());
    }

    fn should_consider_file(&mut self, _file: &Path) -> bool {
        true
    }

    fn on_file(&mut self, file: &Path) {
        self.visited.push(file.to_path_buf());
    }
}

fn scope(base_dir: &Path, recursive: bool) -> SelectScope<'_> {
    SelectScope { base_dir, recursive, prune_selected: false }
}

fn exact(literal: &str) -> SelectionCriterion {
    SelectionCriterion::parse(literal, MatchMode::Exact).unwrap()
}

fn tree(root: &Path) -> BTreeSet<PathBuf> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap().path().strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

// ---------------------------------------------------------------------------
// Navigator
// ---------------------------------------------------------------------------

#[test]
fn walk_visits_every_entry_once() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");

    let mut recorder = Recorder::default();
    navigate(&root, &mut recorder);

    let unique: BTreeSet<_> = recorder.visited.iter().cloned().collect();
    assert_eq!(unique.len(), recorder.visited.len(), "no entry reported twice");

    let expected: BTreeSet<_> = walkdir::WalkDir::new(&root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap().into_path())
        .collect();
    assert_eq!(unique, expected);
}

#[test]
fn walk_reports_files_before_subdirs_and_dirs_before_contents() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");

    let mut recorder = Recorder::default();
    navigate(&root, &mut recorder);

    let pos = |p: &str| {
        recorder
            .visited
            .iter()
            .position(|v| v == &root.join(p))
            .unwrap()
    };
    assert!(pos("file.txt") < pos("sub"));
    assert!(pos("notes.md") < pos("logs"));
    assert!(pos("sub") < pos("sub/file.txt"));
    assert!(pos("sub/deep") < pos("sub/deep/data.csv"));
}

#[test]
fn exploration_is_independent_of_selection() {
    struct FilesOutsideSub(Vec<PathBuf>);

    impl Visitor for FilesOutsideSub {
        fn should_explore(&mut self, dir: &Path) -> bool {
            !dir.ends_with("sub")
        }
        fn should_consider_file(&mut self, _file: &Path) -> bool {
            true
        }
        fn on_file(&mut self, file: &Path) {
            self.0.push(file.to_path_buf());
        }
    }

    let dir = setup_test_dir();
    let root = dir.path().join("root");

    let mut visitor = FilesOutsideSub(Vec::new());
    navigate(&root, &mut visitor);

    assert_eq!(visitor.0.len(), 3, "file.txt, notes.md, logs/app.log");
    assert!(visitor.0.iter().all(|p| !p.starts_with(root.join("sub"))));
}

#[test]
fn missing_root_walks_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut recorder = Recorder::default();
    navigate(&dir.path().join("nope"), &mut recorder);
    assert!(recorder.visited.is_empty());
}

#[test]
fn vanished_subdir_walks_as_empty() {
    /// Deletes `sub` as soon as it is reported, before it is explored.
    struct Vandal(Recorder);

    impl Visitor for Vandal {
        fn should_consider_dir(&mut self, _dir: &Path) -> bool {
            true
        }
        fn on_dir(&mut self, dir: &Path) {
            if dir.ends_with("sub") {
                fs::remove_dir_all(dir).unwrap();
            }
            self.0.on_dir(dir);
        }
        fn should_consider_file(&mut self, _file: &Path) -> bool {
            true
        }
        fn on_file(&mut self, file: &Path) {
            self.0.on_file(file);
        }
    }

    let dir = setup_test_dir();
    let root = dir.path().join("root");

    let mut vandal = Vandal(Recorder::default());
    navigate(&root, &mut vandal);

    let visited = &vandal.0.visited;
    assert!(visited.contains(&root.join("sub")));
    assert!(visited.iter().all(|p| !p.starts_with(root.join("sub/deep"))));
    assert!(visited.contains(&root.join("logs/app.log")), "siblings are still walked");
    assert!(visited.contains(&root.join("notes.md")));
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

#[test]
fn exact_name_resolves_under_base() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");

    let found = select(&exact("file.txt"), EntryKindFilter::all(), scope(&root.join("sub"), false));
    assert_eq!(found.iter().collect::<Vec<_>>(), [&root.join("sub/file.txt")]);
}

#[test]
fn exact_absolute_path_is_used_as_is() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let target = root.join("logs/app.log");

    let found = select(
        &exact(&target.to_string_lossy()),
        EntryKindFilter::all(),
        scope(&root.join("sub"), false),
    );
    assert!(found.contains(&target));
    assert_eq!(found.len(), 1);
}

#[test]
fn exact_respects_kind_filter() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");

    let found = select(&exact("sub/"), EntryKindFilter::files_only(), scope(&root, false));
    assert!(found.is_empty());

    let found = select(&exact("sub/"), EntryKindFilter::dirs_only(), scope(&root, false));
    assert!(found.contains(&root.join("sub")));
}

#[test]
fn exact_recursive_finds_one_per_directory() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");

    let found = select(&exact("file.txt"), EntryKindFilter::all(), scope(&root, true));
    let expected: CandidateSet = ["file.txt", "sub/file.txt", "sub/deep/file.txt"]
        .iter()
        .map(|p| root.join(p))
        .collect();
    assert_eq!(found, expected);
}

#[test]
fn name_regex_non_recursive_stays_at_top() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let criterion = SelectionCriterion::parse(r"\.(txt|md)$", MatchMode::NameRegex).unwrap();

    let found = select(&criterion, EntryKindFilter::all(), scope(&root, false));
    assert_eq!(found.len(), 2);
    assert!(found.contains(&root.join("file.txt")));
    assert!(found.contains(&root.join("notes.md")));
}

#[test]
fn path_regex_recursive_matches_full_paths() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let criterion = SelectionCriterion::parse(r"sub/deep/[^/]+$", MatchMode::PathRegex).unwrap();

    let found = select(&criterion, EntryKindFilter::files_only(), scope(&root, true));
    assert_eq!(found.len(), 2);
    assert!(found.contains(&root.join("sub/deep/data.csv")));
}

#[test]
fn dirs_only_never_selects_files() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let criterion = SelectionCriterion::parse(".*", MatchMode::NameRegex).unwrap();

    let found = select(&criterion, EntryKindFilter::dirs_only(), scope(&root, true));
    assert_eq!(found.len(), 3, "sub, sub/deep, logs");
    assert!(found.iter().all(|p| p.is_dir()));
}

#[test]
fn pruning_skips_inside_selected_dirs() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let criterion = SelectionCriterion::parse("^(sub|deep|file.txt)$", MatchMode::NameRegex).unwrap();

    let pruned = select(
        &criterion,
        EntryKindFilter::all(),
        SelectScope { base_dir: &root, recursive: true, prune_selected: true },
    );
    assert!(pruned.contains(&root.join("sub")));
    assert!(!pruned.contains(&root.join("sub/deep")));

    let full = select(&criterion, EntryKindFilter::all(), scope(&root, true));
    assert!(full.contains(&root.join("sub/deep")));
    assert!(full.contains(&root.join("sub/deep/file.txt")));
}

// ---------------------------------------------------------------------------
// Copy engine
// ---------------------------------------------------------------------------

#[test]
fn root_relative_copy_keeps_sub_path() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");

    Copier::new(&root, &out).copy(&root.join("sub/file.txt")).unwrap();

    assert_eq!(fs::read(out.join("sub/file.txt")).unwrap(), b"sub");
}

#[test]
fn flatten_copy_drops_ancestry() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");

    Copier::new(&root, &out)
        .strategy(CopyStrategy::Flatten)
        .copy(&root.join("sub/deep/data.csv"))
        .unwrap();

    assert!(out.join("data.csv").is_file());
    assert!(!out.join("sub").exists());
}

#[test]
fn flatten_keeps_structure_below_selected_dir() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");

    Copier::new(&root, &out)
        .strategy(CopyStrategy::Flatten)
        .recurse_contents(true)
        .copy(&root.join("sub"))
        .unwrap();

    let expected: BTreeSet<PathBuf> = tree(&root.join("sub"))
        .into_iter()
        .map(|p| Path::new("sub").join(p))
        .chain([PathBuf::from("sub")])
        .collect();
    assert_eq!(tree(&out), expected);
}

#[test]
fn recursive_copy_replicates_whole_tree() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");

    Copier::new(&root, &out)
        .recurse_contents(true)
        .copy(&root.join("sub"))
        .unwrap();

    assert_eq!(fs::read(out.join("sub/deep/file.txt")).unwrap(), b"deep");
    assert_eq!(fs::read(out.join("sub/deep/data.csv")).unwrap(), b"a,b\n1,2\n");
}

#[test]
fn non_recursive_dir_copy_creates_only_the_dir() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");

    Copier::new(&root, &out).copy(&root.join("sub")).unwrap();

    assert!(out.join("sub").is_dir());
    assert_eq!(fs::read_dir(out.join("sub")).unwrap().count(), 0);
}

#[test]
fn entries_outside_root_are_rejected() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");
    let stray = dir.path().join("stray.txt");
    fs::write(&stray, "stray").unwrap();

    let err = Copier::new(&root, &out).copy(&stray).unwrap_err();
    assert!(matches!(err, PluckError::OutsideRoot { .. }));
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn missing_source_is_not_found() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");

    let err = Copier::new(&root, dir.path().join("out"))
        .copy(&root.join("ghost.txt"))
        .unwrap_err();
    assert!(matches!(err, PluckError::NotFound(_)));
    assert!(!err.is_transient());
}

#[test]
fn existing_destination_is_kept_when_policy_declines() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");
    fs::create_dir_all(out.join("sub")).unwrap();
    fs::write(out.join("sub/file.txt"), "keep me").unwrap();

    let err = Copier::new(&root, &out)
        .overwrite(|_: &Path| false)
        .copy(&root.join("sub/file.txt"))
        .unwrap_err();

    assert!(matches!(err, PluckError::DestinationConflict(_)));
    assert_eq!(fs::read_to_string(out.join("sub/file.txt")).unwrap(), "keep me");
}

#[test]
fn overwriting_twice_is_idempotent() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");
    let copier = Copier::new(&root, &out)
        .recurse_contents(true)
        .overwrite(|_: &Path| true);

    copier.copy(&root.join("sub")).unwrap();
    let first = fs::read(out.join("sub/deep/data.csv")).unwrap();
    copier.copy(&root.join("sub")).unwrap();
    let second = fs::read(out.join("sub/deep/data.csv")).unwrap();

    assert_eq!(first, second);
    assert_eq!(tree(&out.join("sub")), tree(&root.join("sub")));
}

#[test]
fn batch_continues_past_failures() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");

    let results = Copier::new(&root, &out).copy_all([
        root.join("file.txt"),
        root.join("ghost.txt"),
        root.join("logs/app.log"),
    ]);

    assert_eq!(results.requested, 3);
    assert_eq!(results.copied, 2);
    assert!(!results.all_copied());
    assert_eq!(results.failed_paths().collect::<Vec<_>>(), [&root.join("ghost.txt")]);
    assert!(out.join("logs/app.log").is_file());
}

#[test]
fn observer_sees_every_copy() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    Copier::new(&root, &out)
        .recurse_contents(true)
        .observer(move |from: &Path, to: &Path| {
            sink.lock().unwrap().push((from.to_path_buf(), to.to_path_buf()));
        })
        .copy(&root.join("sub"))
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 5, "sub, sub/file.txt, sub/deep and its two files");
    assert!(seen.contains(&(root.join("sub/deep/data.csv"), out.join("sub/deep/data.csv"))));
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[test]
fn job_copies_exact_name_from_base() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");

    let results = job()
        .criterion("file.txt")
        .base_dir(root.join("sub"))
        .source_root(&root)
        .destination(&out)
        .build()
        .unwrap()
        .run();

    assert!(results.all_copied());
    assert_eq!(fs::read(out.join("sub/file.txt")).unwrap(), b"sub");
    assert!(!out.join("file.txt").exists());
}

#[test]
fn job_normalizes_dotted_roots() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");

    let job = job()
        .criterion("file.txt")
        .source_root(root.join("sub/.."))
        .base_dir(root.join("sub"))
        .destination(out.join("."))
        .build()
        .unwrap();

    assert_eq!(job.source_root(), root.as_path());
    assert_eq!(job.destination(), out.as_path());

    let results = job.run();
    assert!(results.all_copied(), "{:?}", results.errors);
    assert_eq!(fs::read(out.join("sub/file.txt")).unwrap(), b"sub");
}

#[test]
fn job_flattens_recursive_regex_matches() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");

    let results = job()
        .criterion(r"\.(csv|log)$")
        .name_regex()
        .source_root(&root)
        .destination(&out)
        .recursive_selection(true)
        .kinds(EntryKindFilter::files_only())
        .flatten(true)
        .build()
        .unwrap()
        .run();

    assert_eq!(results.copied, 2);
    let expected: BTreeSet<PathBuf> = ["app.log", "data.csv"].into_iter().map(PathBuf::from).collect();
    assert_eq!(tree(&out), expected);
}

#[test]
fn job_recursive_copy_of_selected_dirs() {
    let dir = setup_test_dir();
    let root = dir.path().join("root");
    let out = dir.path().join("out");

    let job = job()
        .criterion("^sub$")
        .name_regex()
        .source_root(&root)
        .destination(&out)
        .recursive_selection(true)
        .recursive_copy(true)
        .kinds(EntryKindFilter::dirs_only())
        .build()
        .unwrap();

    assert_eq!(job.select().len(), 1);
    assert!(job.run().all_copied());
    assert_eq!(tree(&out.join("sub")), tree(&root.join("sub")));
}

#[test]
fn job_without_destination_is_rejected() {
    let err = job().criterion("x").build().err().unwrap();
    assert!(matches!(err, PluckError::InvalidConfig(_)));
}

#[test]
fn job_with_bad_regex_is_rejected() {
    let err = job()
        .criterion("[unclosed")
        .path_regex()
        .destination("/tmp")
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, PluckError::InvalidPattern(_)));
}
