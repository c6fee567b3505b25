//! Daily snapshot runner CLI.
//!
//! Runs the PSI and GEO collectors with date-stamped output paths and
//! appends one status line per run. Every flag has a default so a
//! scheduler (cron, Task Scheduler) can invoke `snapshot run` with no
//! arguments from the workspace root.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use snapshot::collector::ProcessCollectorRunner;
use snapshot::exit_codes;
use snapshot::layout::RunLayout;
use snapshot::rotate::rotate_reports;
use snapshot::run::run_snapshot;
use snapshot::settings::load_settings;

#[derive(Parser)]
#[command(name = "snapshot", version, about = "Daily PSI/GEO snapshot runner")]
struct Cli {
    /// Workspace root the collectors run in. Defaults to the current directory.
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Settings file. Defaults to `<root>/snapshot.toml`.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one snapshot run: PSI then GEO, or the combined fallback.
    Run,
    /// Delete report files older than the retention window.
    Rotate {
        /// Keep reports newer than this many days.
        #[arg(long, default_value_t = 90)]
        keep_days: u32,
        /// Report what would be deleted without deleting.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the resolved report and log paths for today.
    Paths,
}

fn main() {
    snapshot::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("resolve current directory")?,
    };
    let settings_path = cli
        .settings
        .unwrap_or_else(|| root.join("snapshot.toml"));
    let settings = load_settings(&settings_path)?;

    match cli.command {
        Command::Run => {
            let report = run_snapshot(&root, &settings, &ProcessCollectorRunner)?;
            println!(
                "run: id={} mode={:?} logged '{}'",
                report.run_id,
                report.mode,
                report.status_line()
            );
            Ok(())
        }
        Command::Rotate { keep_days, dry_run } => {
            let today = Local::now().date_naive();
            let outcome = rotate_reports(&root, &settings, keep_days, dry_run, today)?;
            let verb = if dry_run { "would remove" } else { "removed" };
            for path in &outcome.removed {
                println!("rotate: {verb} {}", path.display());
            }
            println!(
                "rotate: {verb} {} file(s), kept {} (keep_days={})",
                outcome.removed.len(),
                outcome.kept,
                keep_days
            );
            Ok(())
        }
        Command::Paths => {
            let layout = RunLayout::new(&root, &settings, Local::now().date_naive());
            println!("psi: {}", layout.psi_report_path.display());
            println!("geo: {}", layout.geo_report_path.display());
            println!("log: {}", layout.status_log_path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run() {
        let cli = Cli::parse_from(["snapshot", "run"]);
        assert!(matches!(cli.command, Command::Run));
        assert!(cli.root.is_none());
    }

    #[test]
    fn parse_rotate_flags() {
        let cli = Cli::parse_from(["snapshot", "rotate", "--keep-days", "30", "--dry-run"]);
        match cli.command {
            Command::Rotate { keep_days, dry_run } => {
                assert_eq!(keep_days, 30);
                assert!(dry_run);
            }
            _ => panic!("expected rotate"),
        }
    }

    #[test]
    fn parse_global_root() {
        let cli = Cli::parse_from(["snapshot", "run", "--root", "/srv/audit"]);
        assert_eq!(cli.root, Some(PathBuf::from("/srv/audit")));
    }
}
