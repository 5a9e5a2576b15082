use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pluck::{EntryKindFilter, MatchMode};

#[derive(Parser, Debug)]
#[command(name = "pluck")]
#[command(about = "Select files or directories by name, path or regex and copy them", long_about = None)]
struct Cli {
    /// Absolute path, relative path, name, or regex
    criterion: String,

    /// Root used to compute destination sub-paths (defaults to the current directory)
    source_root: Option<PathBuf>,

    /// Directory the copies are written under
    #[arg(short = 'o', long = "dest", visible_alias = "destination")]
    destination: PathBuf,

    /// Directory to start searching from (defaults to the source root)
    #[arg(long = "base")]
    base_dir: Option<PathBuf>,

    /// Criterion is a regex matched against entry names
    #[arg(short = 'x', long = "name-regex", visible_alias = "nx", conflicts_with = "path_regex")]
    name_regex: bool,

    /// Criterion is a regex matched against full entry paths
    #[arg(long = "path-regex", visible_alias = "px")]
    path_regex: bool,

    /// Search the whole subtree under the base directory
    #[arg(short = 'r', long = "recursive-selection", visible_alias = "rs")]
    recursive_selection: bool,

    /// Copy the contents of selected directories
    #[arg(long = "recursive-copy", visible_alias = "rc")]
    recursive_copy: bool,

    /// Only select files
    #[arg(short = 'f', long = "files", conflicts_with_all = ["dirs", "all"])]
    files: bool,

    /// Only select directories
    #[arg(short = 'd', long = "dirs", conflicts_with = "all")]
    dirs: bool,

    /// Select files and directories (default)
    #[arg(long = "all", visible_aliases = ["fd", "df"])]
    all: bool,

    /// Copy selected entries directly under the destination by name
    #[arg(long)]
    flatten: bool,

    /// Watch the source root and copy matching changes until interrupted
    #[arg(short = 'w', long)]
    watch: bool,

    /// Print every copy as `from -> to`
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print the resolved options before running
    #[arg(short = 'e', long, visible_alias = "ex")]
    explain: bool,
}

impl Cli {
    fn mode(&self) -> MatchMode {
        if self.name_regex {
            MatchMode::NameRegex
        } else if self.path_regex {
            MatchMode::PathRegex
        } else {
            MatchMode::Exact
        }
    }

    fn kinds(&self) -> EntryKindFilter {
        if self.all {
            EntryKindFilter::all()
        } else {
            EntryKindFilter::new(self.files, self.dirs)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut builder = pluck::job()
        .criterion(cli.criterion.clone())
        .mode(cli.mode())
        .destination(cli.destination.clone())
        .recursive_selection(cli.recursive_selection)
        .recursive_copy(cli.recursive_copy)
        .kinds(cli.kinds())
        .flatten(cli.flatten);

    if let Some(root) = &cli.source_root {
        builder = builder.source_root(root);
    }
    if let Some(base) = &cli.base_dir {
        builder = builder.base_dir(base);
    }
    if cli.verbose {
        builder = builder.on_copied(|from: &Path, to: &Path| {
            println!("{} -> {}", from.display(), to.display());
        });
    }

    let job = match builder.build() {
        Ok(job) => job,
        Err(e) => {
            error!(error = %e, "invalid options");
            return ExitCode::from(2);
        }
    };

    if cli.explain {
        for line in job.explain() {
            eprintln!("{line}");
        }
    }

    if cli.watch {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        return match job.watch(cancel).await {
            Ok(summary) => {
                info!(
                    copied = summary.copied,
                    discarded = summary.discarded,
                    flushes = summary.flush_cycles,
                    "watch stopped"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "watch failed");
                ExitCode::from(2)
            }
        };
    }

    let results = job.run();
    for e in &results.errors {
        if e.is_transient() {
            error!(error = %e, "copy failed");
        }
    }
    info!(
        requested = results.requested,
        copied = results.copied,
        elapsed = ?results.duration,
        "done"
    );

    if results.all_copied() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
