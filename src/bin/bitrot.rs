//! # Bitrot CLI - find silently corrupted files
//!
//! ## Usage
//! ```bash
//! # Record a baseline, then compare on every later run
//! bitrot check ~/Pictures
//!
//! # Show every category, not only flagged files
//! bitrot check ~/Pictures --list
//!
//! # Compare without recording the new state
//! bitrot check ~/Pictures --dry-run
//!
//! # Stored snapshots
//! bitrot history ~/Pictures
//! bitrot status ~/Pictures
//! ```
//!
//! Exit status: `0` when nothing was flagged, `2` when files look corrupted,
//! `1` on any other error.

use bitrot::{Bitrot, BitrotBuilder, CheckReport, Config, ProgressInfo, Result};
use clap::{Parser, Subcommand};
use colored::*;
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const EXIT_ERROR: i32 = 1;
const EXIT_CORRUPTION: i32 = 2;

/// Bitrot CLI - detect silent data corruption
#[derive(Parser)]
#[command(name = "bitrot")]
#[command(version)]
#[command(about = "Detect files whose content changed without their modification time changing")]
#[command(long_about = None)]
struct Cli {
    /// Configuration directory (defaults to ~/.bitrot)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Additional file or directory name to skip (repeatable)
    #[arg(short, long, global = true)]
    exclude: Vec<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory and compare it with its previous snapshot
    Check {
        /// Directory to check
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Do not record the new snapshot
        #[arg(long)]
        dry_run: bool,

        /// Show progress
        #[arg(long)]
        progress: bool,

        /// List paths in every category
        #[arg(short, long)]
        list: bool,
    },

    /// Record a snapshot without comparing
    Snapshot {
        /// Directory to scan
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Show progress
        #[arg(long)]
        progress: bool,
    },

    /// List stored snapshots of a directory
    History {
        /// Directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Show the latest snapshot of a directory
    Status {
        /// Directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so reports on stdout stay clean
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_CORRUPTION),
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e.user_message());
            std::process::exit(EXIT_ERROR);
        }
    }
}

/// Run the command; `Ok(false)` means corruption was flagged
fn run(cli: Cli) -> Result<bool> {
    let config = match cli.config_dir {
        Some(dir) => Config::load(dir)?,
        None => Config::load_default()?,
    }
    .with_extra_exclusions(cli.exclude);

    match cli.command {
        Commands::Check {
            dir,
            dry_run,
            progress,
            list,
        } => cmd_check(config, dir, dry_run, progress, list),
        Commands::Snapshot { dir, progress } => cmd_snapshot(config, dir, progress).map(|_| true),
        Commands::History { dir } => cmd_history(config, dir).map(|_| true),
        Commands::Status { dir } => cmd_status(config, dir).map(|_| true),
    }
}

/// Hashing progress bar, fed from scanner threads
fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message("Hashing files...");
    pb
}

fn open_bitrot(config: Config, dry_run: bool, progress: Option<&ProgressBar>) -> Result<Bitrot> {
    let mut builder = BitrotBuilder::new().config(config).dry_run(dry_run);

    if let Some(pb) = progress {
        let pb = pb.clone();
        builder = builder.progress_callback(Arc::new(move |info: ProgressInfo| {
            if let Some(total) = info.total {
                pb.set_length(total as u64);
            }
            pb.set_position(info.processed as u64);
        }));
    }

    builder.build()
}

/// Check a directory against its last snapshot
fn cmd_check(config: Config, dir: PathBuf, dry_run: bool, show_progress: bool, list: bool) -> Result<bool> {
    let progress = show_progress.then(progress_bar);
    let bitrot = open_bitrot(config, dry_run, progress.as_ref())?;

    println!("{} {}", "Checking".blue().bold(), dir.display());
    let report = bitrot.check(&dir);

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let report = report?;

    print_check_report(&report, list);
    Ok(report.success())
}

fn print_check_report(report: &CheckReport, list: bool) {
    let Some(comparison) = report.comparison.as_ref() else {
        println!(
            "{} First run: recorded {} files",
            "✓".green().bold(),
            report.snapshot.len().to_string().cyan()
        );
        print_saved(report);
        return;
    };

    let stats = comparison.stats();
    println!();
    println!("  Unchanged: {}", stats.unchanged.to_string().cyan());
    println!("  Modified:  {}", stats.modified.to_string().cyan());
    println!("  Added:     {}", stats.added.to_string().green());
    println!("  Deleted:   {}", stats.deleted.to_string().yellow());
    println!("  Renamed:   {}", stats.renamed.to_string().cyan());
    println!("  Flagged:   {}", colorize_flagged(stats.flagged));
    println!("  Checked:   {}", comparison.total_checked().to_string().bold());
    println!("  Time:      {}", format_duration(truncate_millis(report.duration)).to_string().cyan());

    if list {
        print_paths("Modified", "~".yellow(), comparison.modified_paths());
        print_paths("Added", "+".green(), comparison.added_paths());
        print_paths("Deleted", "-".red(), comparison.deleted_paths());

        if !comparison.renamed_paths().is_empty() {
            println!("\n{}", "Renamed:".bold());
            for pair in comparison.renamed_paths() {
                println!("  {} {} -> {}", "→".blue(), pair.old_path, pair.new_path);
            }
        }
    }

    if !comparison.ambiguous_hashes().is_empty() {
        println!(
            "\n{} {} renames were matched between identical files by name order",
            "Note:".dimmed(),
            comparison.ambiguous_hashes().len()
        );
    }

    if comparison.success() {
        println!("\n{} No corruption detected", "✓".green().bold());
    } else {
        println!(
            "\n{} {} files changed content without changing modification time:",
            "✗".red().bold(),
            stats.flagged.to_string().red().bold()
        );
        for path in comparison.flagged_paths() {
            println!("  {} {}", "!".red().bold(), path.red());
        }
    }

    print_saved(report);
}

fn colorize_flagged(count: usize) -> ColoredString {
    if count == 0 {
        count.to_string().green()
    } else {
        count.to_string().red().bold()
    }
}

fn print_paths(title: &str, marker: ColoredString, paths: &BTreeSet<String>) {
    if paths.is_empty() {
        return;
    }
    println!("\n{}", format!("{}:", title).bold());
    for path in paths {
        println!("  {} {}", marker, path);
    }
}

fn print_saved(report: &CheckReport) {
    match &report.saved_to {
        Some(path) => println!("  Saved: {}", path.display().to_string().dimmed()),
        None => println!("  {}", "Dry run: snapshot not saved".dimmed()),
    }
}

/// Record a snapshot without comparing
fn cmd_snapshot(config: Config, dir: PathBuf, show_progress: bool) -> Result<()> {
    let progress = show_progress.then(progress_bar);
    let bitrot = open_bitrot(config, false, progress.as_ref())?;

    let result = bitrot.snapshot(&dir);
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let (snapshot, saved_to) = result?;

    println!(
        "{} Recorded {} files",
        "✓".green().bold(),
        snapshot.len().to_string().cyan()
    );
    if let Some(path) = saved_to {
        println!("  Saved: {}", path.display().to_string().dimmed());
    }
    Ok(())
}

/// List stored snapshots
fn cmd_history(config: Config, dir: PathBuf) -> Result<()> {
    let bitrot = open_bitrot(config, false, None)?;
    let history = bitrot.history(&dir)?;

    if history.is_empty() {
        println!("{}", "No snapshots found.".yellow());
        return Ok(());
    }

    println!("{}", "Snapshots:".blue().bold());
    println!();
    for summary in &history {
        println!(
            "  {} {} files",
            summary.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            summary.file_count.to_string().cyan()
        );
    }
    println!(
        "\n{}",
        format!("{} snapshots in {}", history.len(), bitrot.store().root_dir(&dir).display()).dimmed()
    );
    Ok(())
}

/// Show the latest snapshot
fn cmd_status(config: Config, dir: PathBuf) -> Result<()> {
    let bitrot = open_bitrot(config, false, None)?;

    match bitrot.latest(&dir)? {
        Some(snapshot) => {
            println!("{}", "Latest snapshot:".blue().bold());
            println!("  {}", snapshot.display_format().cyan());
        }
        None => println!("{}", "No snapshots found.".yellow()),
    }

    let excluded = bitrot.config().exclusion_policy().names().join(", ");
    println!("  Excluded: {}", excluded.dimmed());
    Ok(())
}

fn truncate_millis(duration: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(duration.as_millis() as u64)
}
