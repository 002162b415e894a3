use anyhow::Result;
use clap::{Parser, Subcommand};
use is_terminal::IsTerminal;
use ludvig::areas::repository::GitRepository;
use ludvig::artifacts::history::exclusions::ExclusionSet;
use ludvig::artifacts::history::options::{DEFAULT_MAX_FILE_SIZE, FileFilter, ScanOptions};
use ludvig::commands::plumbing::cat_file::CatFileMode;
use ludvig::commands::plumbing::show_index::show_index;
use ludvig::commands::scan::filesystem::scan_directory;
use ludvig::commands::scan::git::scan_history;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ludvig",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Enumerate every file in a Git history",
    long_about = "Reads Git pack files directly, without a git binary or a checkout, \
    and lists every file ever committed to a repository's history, \
    including files that were later deleted.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "git",
        about = "List every file in the history of the repositories below a path",
        long_about = "This command finds every .git directory below the given path and lists \
        every file of every commit found in their packs and loose objects, oldest commit first. \
        Exclusion globs are read from .ludvigignore in the current directory."
    )]
    Git {
        #[arg(index = 1, help = "The repository (or directory of repositories) to scan")]
        path: PathBuf,
        #[arg(short, long, help = "Scan only this commit, given by its full or abbreviated id")]
        commit: Option<String>,
        #[arg(short, long, help = "Skip non-blobs from their headers and report each blob once")]
        fast: bool,
        #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE, help = "Skip files larger than this many bytes")]
        max_file_size: u64,
        #[arg(short, long, help = "Exclude paths matching this glob")]
        exclude: Vec<String>,
        #[arg(long, help = "Report unchanged files again for every commit")]
        no_dedup: bool,
    },
    #[command(
        name = "filesystem",
        about = "List every file below a directory",
        long_about = "This command lists every regular file below the given directory, \
        skipping .git directories and applying the same size and exclusion limits as history scans."
    )]
    Filesystem {
        #[arg(index = 1, help = "The directory to scan")]
        path: PathBuf,
        #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE, help = "Skip files larger than this many bytes")]
        max_file_size: u64,
        #[arg(short, long, help = "Exclude paths matching this glob")]
        exclude: Vec<String>,
    },
    #[command(
        name = "cat-file",
        about = "Print the content of an object",
        long_about = "This command prints an object from the repository's packs or loose objects. \
        Commits are shown as their header fields, trees as one line per entry, blobs as raw bytes."
    )]
    CatFile {
        #[arg(index = 1, help = "The object SHA, possibly abbreviated")]
        sha: String,
        #[arg(short, long, default_value = ".", help = "The repository to read from")]
        repo: PathBuf,
        #[arg(short = 't', conflicts_with = "size", help = "Print the object type instead")]
        object_type: bool,
        #[arg(short = 's', help = "Print the object size instead")]
        size: bool,
    },
    #[command(
        name = "ls-tree",
        about = "List every file below a tree",
        long_about = "This command lists every file below a tree, recursively. \
        Given a commit, its root tree is listed."
    )]
    LsTree {
        #[arg(index = 1, help = "The tree or commit SHA, possibly abbreviated")]
        sha: String,
        #[arg(short, long, default_value = ".", help = "The repository to read from")]
        repo: PathBuf,
    },
    #[command(
        name = "rev-list",
        about = "List the commits a history scan visits",
        long_about = "This command lists every commit found in the repository, oldest first."
    )]
    RevList {
        #[arg(short, long, default_value = ".", help = "The repository to read from")]
        repo: PathBuf,
    },
    #[command(
        name = "show-index",
        about = "Print the entries of a pack index",
        long_about = "This command prints the pack offset and object id of every entry of a .idx file."
    )]
    ShowIndex {
        #[arg(index = 1, help = "The .idx file")]
        index: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ludvig=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Commands::Git {
            path,
            commit,
            fast,
            max_file_size,
            exclude,
            no_dedup,
        } => {
            let mut options = ScanOptions::default()
                .with_fast_scan(fast)
                .with_filter(file_filter(max_file_size, &exclude)?)
                .with_dedup_unchanged(!no_dedup);
            if let Some(commit) = commit {
                options = options.with_revision(commit);
            }

            scan_history(&path, options, &mut stdout)?;
        }
        Commands::Filesystem {
            path,
            max_file_size,
            exclude,
        } => {
            scan_directory(&path, file_filter(max_file_size, &exclude)?, &mut stdout)?;
        }
        Commands::CatFile {
            sha,
            repo,
            object_type,
            size,
        } => {
            let mode = if object_type {
                CatFileMode::Type
            } else if size {
                CatFileMode::Size
            } else {
                CatFileMode::Pretty
            };
            GitRepository::open(&repo)?.cat_file(&sha, mode, &mut stdout)?
        }
        Commands::LsTree { sha, repo } => GitRepository::open(&repo)?.ls_tree(&sha, &mut stdout)?,
        Commands::RevList { repo } => GitRepository::open(&repo)?.rev_list(&mut stdout)?,
        Commands::ShowIndex { index } => show_index(&index, &mut stdout)?,
    }

    Ok(())
}

/// Exclusions from the command line plus `.ludvigignore` in the working directory
fn file_filter(max_file_size: u64, exclude: &[String]) -> Result<FileFilter> {
    let mut exclusions = ExclusionSet::load_ignore_file(Path::new("."))?;
    exclusions.extend(ExclusionSet::new(exclude)?);

    Ok(FileFilter::new(max_file_size, exclusions))
}
