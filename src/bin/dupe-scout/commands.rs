use clap::{Args, Parser, Subcommand};
use dupe_scout::AppConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dupe-scout")]
#[command(about = "Find exact and near duplicate files, and catch new ones as they arrive", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan paths for exact and similar duplicates
    Scan(ScanArgs),
    /// Watch a directory and flag duplicates as they are written
    Monitor(MonitorArgs),
    /// Scan, then move or copy duplicates into one folder per group
    Organize(OrganizeArgs),
    /// Print configuration values
    PrintConfig,
}

impl Commands {
    /// Short name used for the per-command log file.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Scan(_) => "scan",
            Commands::Monitor(_) => "monitor",
            Commands::Organize(_) => "organize",
            Commands::PrintConfig => "print-config",
        }
    }
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directories to scan (defaults to root_paths from the config)
    pub paths: Vec<String>,
    /// Only look at files directly inside each path
    #[arg(long)]
    pub no_recursive: bool,
    /// Only include files with this extension (repeatable)
    #[arg(long = "ext")]
    pub extensions: Vec<String>,
    /// Similarity threshold for same-name documents, 0.0 to 1.0
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Also list files that share a name
    #[arg(long)]
    pub show_names: bool,
}

impl ScanArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if !self.paths.is_empty() {
            config.root_paths = self.paths.clone();
        }
        if self.no_recursive {
            config.recursive = false;
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        }
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = threshold;
        }
    }
}

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Directory to watch (defaults to monitor.directory from the config)
    pub directory: Option<PathBuf>,
    /// Only report duplicates, leave them where they are
    #[arg(long)]
    pub no_organize: bool,
    /// Where detected duplicates are moved
    #[arg(long)]
    pub organize_path: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    #[command(flatten)]
    pub scan: ScanArgs,
    /// Destination for the per-group folders
    #[arg(long)]
    pub dest: PathBuf,
    /// Copy instead of move
    #[arg(long)]
    pub copy: bool,
    /// Also move the first file of each group
    #[arg(long)]
    pub move_all: bool,
    /// Delete every exact duplicate except the most recently modified copy
    #[arg(long, conflicts_with_all = ["copy", "move_all"])]
    pub keep_newest: bool,
    /// Print the plan without touching any file
    #[arg(long)]
    pub dry_run: bool,
}
