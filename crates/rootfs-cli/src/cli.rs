//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use rootfs_core::UidRange;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rootfs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Materialize an image archive into a root directory
    Extract(ExtractArgs),
    /// Print one regular file from an image archive
    Cat(CatArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the image archive (tar or tar.gz)
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Root directory to materialize into (created if missing)
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Replace existing files; directories are merged
    #[arg(long)]
    pub overwrite: bool,

    /// Only extract this path (can be repeated)
    #[arg(long = "only", value_name = "PATH")]
    pub only: Vec<PathBuf>,

    /// Shift owners into a user namespace range
    #[arg(long, value_name = "SHIFT:COUNT")]
    pub uid_range: Option<UidRange>,

    /// Allow hard links to appear before their target
    #[arg(long)]
    pub defer_hardlinks: bool,
}

#[derive(clap::Args)]
pub struct CatArgs {
    /// Path to the image archive (tar or tar.gz)
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Path of the file inside the archive
    #[arg(value_name = "NAME")]
    pub name: PathBuf,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}
