//! Rotation of old date-stamped report files.
//!
//! The runner owns the report directories, so retention is applied to the
//! files themselves: anything with a date stamp older than the keep window
//! is deleted. Files without a parseable stamp are left untouched.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use tracing::{debug, info};

use crate::settings::Settings;

/// Result of one rotation pass.
#[derive(Debug, Clone, Default)]
pub struct RotateOutcome {
    /// Files removed, or that would be removed under dry run. Sorted.
    pub removed: Vec<PathBuf>,
    /// Date-stamped files examined and kept.
    pub kept: usize,
    pub dry_run: bool,
}

/// Delete report files whose date stamp is more than `keep_days` days
/// before `today`, from both report directories.
pub fn rotate_reports(
    root: &Path,
    settings: &Settings,
    keep_days: u32,
    dry_run: bool,
    today: NaiveDate,
) -> Result<RotateOutcome> {
    let cutoff = today
        .checked_sub_days(Days::new(u64::from(keep_days)))
        .with_context(|| format!("compute cutoff for keep_days={keep_days}"))?;
    debug!(%cutoff, dry_run, "rotation started");

    let mut outcome = RotateOutcome {
        dry_run,
        ..RotateOutcome::default()
    };
    for dir in [
        root.join(&settings.psi_report_dir),
        root.join(&settings.geo_report_dir),
    ] {
        if !dir.exists() {
            continue;
        }
        for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
            let entry = entry.context("read entry")?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(stamp) = file_date_stamp(&path) else {
                continue;
            };
            if stamp >= cutoff {
                outcome.kept += 1;
                continue;
            }
            if !dry_run {
                fs::remove_file(&path)
                    .with_context(|| format!("remove {}", path.display()))?;
            }
            outcome.removed.push(path);
        }
    }
    outcome.removed.sort();

    info!(
        removed = outcome.removed.len(),
        kept = outcome.kept,
        dry_run,
        "rotation finished"
    );
    Ok(outcome)
}

/// Parse the `YYYY-MM-DD` stamp out of names like `psi_2026-08-04.csv`.
fn file_date_stamp(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    let (_, stamp) = stem.rsplit_once('_')?;
    NaiveDate::parse_from_str(stamp, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    fn seed_reports(root: &Path, settings: &Settings) {
        for dir in [&settings.psi_report_dir, &settings.geo_report_dir] {
            fs::create_dir_all(root.join(dir)).expect("report dir");
        }
        for name in ["psi_2026-01-01.csv", "psi_2026-08-01.csv", "notes.txt"] {
            fs::write(root.join(&settings.psi_report_dir).join(name), "x").expect("psi file");
        }
        for name in ["geo_2026-01-01.csv", "geo_2026-08-01.csv"] {
            fs::write(root.join(&settings.geo_report_dir).join(name), "x").expect("geo file");
        }
    }

    #[test]
    fn removes_only_old_dated_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let settings = Settings::default();
        seed_reports(root, &settings);

        let outcome =
            rotate_reports(root, &settings, 90, false, date("2026-08-04")).expect("rotate");

        assert_eq!(outcome.removed.len(), 2);
        assert_eq!(outcome.kept, 2);
        assert!(!root.join("reports/psi/psi_2026-01-01.csv").exists());
        assert!(root.join("reports/psi/psi_2026-08-01.csv").exists());
        assert!(root.join("reports/psi/notes.txt").exists());
        assert!(!root.join("reports/geo/geo_2026-01-01.csv").exists());
    }

    #[test]
    fn dry_run_deletes_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let settings = Settings::default();
        seed_reports(root, &settings);

        let outcome =
            rotate_reports(root, &settings, 90, true, date("2026-08-04")).expect("rotate");

        assert!(outcome.dry_run);
        assert_eq!(outcome.removed.len(), 2);
        assert!(root.join("reports/psi/psi_2026-01-01.csv").exists());
        assert!(root.join("reports/geo/geo_2026-01-01.csv").exists());
    }

    #[test]
    fn missing_report_dirs_are_fine() {
        let temp = tempfile::tempdir().expect("tempdir");
        let outcome = rotate_reports(
            temp.path(),
            &Settings::default(),
            90,
            false,
            date("2026-08-04"),
        )
        .expect("rotate");
        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.kept, 0);
    }

    #[test]
    fn stamp_parsing_ignores_unrelated_names() {
        assert_eq!(
            file_date_stamp(Path::new("reports/psi/psi_2026-08-04.csv")),
            Some(date("2026-08-04"))
        );
        assert_eq!(file_date_stamp(Path::new("reports/psi/notes.txt")), None);
        assert_eq!(file_date_stamp(Path::new("reports/psi/psi_latest.csv")), None);
    }
}
