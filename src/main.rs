//! dirindex - a persistent filesystem index with aggregated directory sizes.
//!
//! Usage:
//!   dirindex scan [ROOTS...]    Index the given roots (default: /)
//!   dirindex get PATH           Show the indexed record for a path
//!   dirindex list               List every indexed record
//!   dirindex stats              Summary of the current index
//!   dirindex clear              Empty the index and delete the snapshot
//!   dirindex --help             Show help

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use tracing_subscriber::EnvFilter;

use dirindex_core::{IndexConfig, MetadataRecord};
use dirindex_index::{Indexer, ScanProgress};

#[derive(Parser)]
#[command(
    name = "dirindex",
    version,
    about = "A persistent filesystem index with aggregated directory sizes",
    long_about = "dirindex crawls directory trees, totals directory sizes bottom-up \
                  and keeps the result in a snapshot that survives restarts.\n\n\
                  Run `dirindex scan [ROOTS]` to build the index, then query it \
                  with `get`, `list` and `stats`."
)]
struct Cli {
    /// Configuration file (defaults to <config dir>/dirindex/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the snapshot (overrides the config file)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index the given roots, replacing the previous index
    Scan {
        /// Root directories (defaults to /, or the current directory if / is unreadable)
        roots: Vec<PathBuf>,

        /// Report logical file length instead of allocated disk usage
        #[arg(long)]
        apparent_size: bool,

        /// Include hidden entries
        #[arg(short = 'H', long)]
        hidden: bool,
    },

    /// Show the indexed record for a path
    Get {
        /// Path to look up
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List indexed records, largest first
    List {
        /// Only list records without a parent in the index
        #[arg(short, long)]
        roots: bool,

        /// Maximum number of records to show
        #[arg(short = 'n', long)]
        top: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Summary of the current index
    Stats,

    /// Empty the index and delete the snapshot
    Clear,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(state_dir) = cli.state_dir {
        config.state_dir = state_dir;
    }

    match cli.command {
        Command::Scan {
            roots,
            apparent_size,
            hidden,
        } => {
            config.apparent_size |= apparent_size;
            config.include_hidden |= hidden;
            run_scan(config, roots)?;
        }
        Command::Get { path, format } => run_get(config, &path, format)?,
        Command::List { roots, top, format } => run_list(config, roots, top, format)?,
        Command::Stats => run_stats(config),
        Command::Clear => Indexer::new(config).clear(),
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Default location of the configuration file.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dirindex").join("config.toml"))
}

/// Load the configuration file, falling back to defaults when absent.
///
/// An explicitly named file must exist.
fn load_config(explicit: Option<&Path>) -> Result<IndexConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(IndexConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: IndexConfig = toml::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    config.validate()?;

    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()
        .context("Failed to start the async runtime")
}

/// Build the index for `roots` and print a summary.
fn run_scan(config: IndexConfig, roots: Vec<PathBuf>) -> Result<()> {
    let roots = if roots.is_empty() {
        vec![default_root()?]
    } else {
        roots
    };

    let indexer = Indexer::new(config);
    let started = std::time::Instant::now();

    let last_progress = runtime()?.block_on(watch_scan(&indexer, roots))?;

    let stats = indexer.stats();
    println!();
    println!("{}", "─".repeat(60));
    println!(" Indexed {} entries", stats.entries);
    println!(
        " {} files, {} directories, {} root(s)",
        stats.files, stats.directories, stats.roots
    );
    println!(" Total size {}", format_size(stats.total_size));
    println!(" Scanned in {:.2}s", started.elapsed().as_secs_f64());
    if let Some(progress) = last_progress {
        println!(
            " Crawled {} entries at {:.0}/s, {} skipped",
            progress.records_crawled,
            progress.records_per_second(),
            progress.warnings
        );
    }
    println!("{}", "─".repeat(60));

    Ok(())
}

/// Start a scan and report progress on stderr until it finishes.
///
/// Returns the last progress seen while the scan was running.
async fn watch_scan(indexer: &Indexer, roots: Vec<PathBuf>) -> Result<Option<ScanProgress>> {
    if !indexer.start_scan(roots) {
        return Err(eyre!("Scan did not start"));
    }

    let interval = indexer.config().poll_interval();
    let mut last = None;
    while indexer.is_scanning() {
        if let Some(progress) = indexer.progress() {
            if progress.crawl_finished() {
                eprint!("\r Crawled {} entries, totalling sizes...   ", progress.records_crawled);
            } else {
                eprint!(
                    "\r Crawled {} entries ({}/{} roots)   ",
                    progress.records_crawled, progress.roots_done, progress.roots_total
                );
            }
            last = Some(progress);
        }
        tokio::time::sleep(interval).await;
    }
    eprintln!();

    Ok(last)
}

/// `/` when it is listable, otherwise the current directory.
fn default_root() -> Result<PathBuf> {
    let root = PathBuf::from("/");
    if std::fs::read_dir(&root).is_ok() {
        return Ok(root);
    }
    std::env::current_dir().context("No readable default root")
}

fn run_get(config: IndexConfig, path: &Path, format: OutputFormat) -> Result<()> {
    let indexer = Indexer::new(config);
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let record = indexer
        .get_by_path(&path)
        .ok_or_else(|| eyre!("{} is not in the index", path.display()))?;

    match format {
        OutputFormat::Text => print_record(&record),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
    }
    Ok(())
}

fn run_list(
    config: IndexConfig,
    roots_only: bool,
    top: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let indexer = Indexer::new(config);

    let mut records: Vec<MetadataRecord> = indexer
        .get_all()
        .into_iter()
        .filter(|r| !roots_only || r.is_root())
        .collect();
    records.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    records.truncate(top.unwrap_or(usize::MAX));

    match format {
        OutputFormat::Text => {
            for record in &records {
                println!(
                    "{:>10}  {}{}",
                    format_size(record.size),
                    record.path.display(),
                    if record.is_directory { "/" } else { "" }
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
    }
    Ok(())
}

fn run_stats(config: IndexConfig) {
    let indexer = Indexer::new(config);
    let snapshot = indexer.store().snapshot_path();
    let stats = indexer.stats();

    println!(" Snapshot:    {}", snapshot.display());
    println!(" Entries:     {}", stats.entries);
    println!(" Files:       {}", stats.files);
    println!(" Directories: {}", stats.directories);
    println!(" Roots:       {}", stats.roots);
    println!(" Total size:  {}", format_size(stats.total_size));
}

fn print_record(record: &MetadataRecord) {
    println!(" Path:      {}", record.path.display());
    println!(" Name:      {}", record.name);
    println!(
        " Kind:      {}",
        if record.is_directory { "directory" } else { "file" }
    );
    println!(" Size:      {} ({} bytes)", format_size(record.size), record.size);
    if let Some(tag) = &record.type_tag {
        println!(" Type:      {tag}");
    }
    println!(" Modified:  {}", record.modification_time);
    println!(" Created:   {}", record.creation_time);
    match &record.parent_path {
        Some(parent) => println!(" Parent:    {}", parent.display()),
        None => println!(" Parent:    (root)"),
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
