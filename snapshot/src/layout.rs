//! Resolved filesystem layout for a run date.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::settings::Settings;

/// Paths the runner touches for a given run date, resolved against the
/// workspace root. Report files carry the date stamp in their names so a
/// rerun on the same date targets the same artifacts.
#[derive(Debug, Clone)]
pub struct RunLayout {
    pub psi_report_dir: PathBuf,
    pub geo_report_dir: PathBuf,
    pub psi_report_path: PathBuf,
    pub geo_report_path: PathBuf,
    pub status_log_path: PathBuf,
    pub runs_dir: PathBuf,
}

impl RunLayout {
    pub fn new(root: &Path, settings: &Settings, date: NaiveDate) -> Self {
        let stamp = date.format("%Y-%m-%d").to_string();
        let psi_report_dir = root.join(&settings.psi_report_dir);
        let geo_report_dir = root.join(&settings.geo_report_dir);
        Self {
            psi_report_path: psi_report_dir.join(format!("psi_{stamp}.csv")),
            geo_report_path: geo_report_dir.join(format!("geo_{stamp}.csv")),
            psi_report_dir,
            geo_report_dir,
            status_log_path: root.join(&settings.status_log),
            runs_dir: root.join(&settings.runs_dir),
        }
    }

    /// Directory holding one run's report artifact and capture logs.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.runs_dir.join(run_id)
    }

    /// Create every output directory. Safe to call when they already exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.psi_report_dir, &self.geo_report_dir, &self.runs_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("create directory {}", dir.display()))?;
        }
        if let Some(parent) = self.status_log_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        Ok(())
    }
}
