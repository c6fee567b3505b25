//! Runner settings stored in `snapshot.toml` at the workspace root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Snapshot runner settings (TOML).
///
/// The file is optional and intended to be edited by humans; a missing
/// file (or any missing field) falls back to the layout the collector
/// scripts ship with, so the zero-argument scheduled invocation works
/// without one.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Site hostname handed to the GEO collector (e.g. `example.co.za`).
    pub site: String,
    /// PSI strategy (`mobile` or `desktop`).
    pub strategy: String,
    /// Base URL of the audit API the collectors talk to.
    pub server: String,
    /// File with one URL per line, fed to the PSI collector.
    pub urls_file: PathBuf,
    /// File with one geo query per line, fed to the GEO collector.
    pub queries_file: PathBuf,
    /// Snapshot database path handed to the combined fallback collector.
    pub db_file: PathBuf,
    /// Directory for date-stamped PSI report files.
    pub psi_report_dir: PathBuf,
    /// Directory for date-stamped GEO report files.
    pub geo_report_dir: PathBuf,
    /// Append-only status log.
    pub status_log: PathBuf,
    /// Directory for per-run report artifacts.
    pub runs_dir: PathBuf,
    /// Optional `KEY=VALUE` file injected into collector environments.
    pub env_file: PathBuf,
    /// Virtualenv directory whose `bin/` is preferred on the collector PATH.
    pub venv_dir: PathBuf,
    /// Wall-clock budget per collector step in seconds.
    pub step_timeout_secs: u64,
    /// Truncate captured collector stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
    pub psi: CollectorCommand,
    pub geo: CollectorCommand,
    pub combined: CollectorCommand,
}

/// Command vector for one collector invocation.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CollectorCommand {
    /// Program and leading arguments (e.g. `["python3", "scripts/collect_psi.py"]`).
    pub command: Vec<String>,
}

impl CollectorCommand {
    fn new(parts: &[&str]) -> Self {
        Self {
            command: parts.iter().map(|part| (*part).to_string()).collect(),
        }
    }

    /// The script component of the command, when the command has one.
    ///
    /// Interpreter-style commands name their script in the second slot;
    /// a single-element command is a bare program looked up on PATH.
    pub fn script_path(&self) -> Option<&Path> {
        self.command.get(1).map(Path::new)
    }

    /// Whether the command can run from `root`: its script file must exist.
    pub fn is_available(&self, root: &Path) -> bool {
        self.script_path().is_none_or(|script| root.join(script).exists())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site: "example.co.za".to_string(),
            strategy: "mobile".to_string(),
            server: "http://127.0.0.1:8000".to_string(),
            urls_file: PathBuf::from("data/sample_urls.txt"),
            queries_file: PathBuf::from("data/geo_queries.txt"),
            db_file: PathBuf::from("data/snapshots.db"),
            psi_report_dir: PathBuf::from("reports/psi"),
            geo_report_dir: PathBuf::from("reports/geo"),
            status_log: PathBuf::from("logs/snapshot.log"),
            runs_dir: PathBuf::from("logs/runs"),
            env_file: PathBuf::from("config.env"),
            venv_dir: PathBuf::from("venv"),
            step_timeout_secs: 30 * 60,
            output_limit_bytes: 1_000_000,
            psi: CollectorCommand::new(&["python3", "scripts/collect_psi.py"]),
            geo: CollectorCommand::new(&["python3", "scripts/collect_geo.py"]),
            combined: CollectorCommand::new(&["python3", "scripts/daily_snapshot.py"]),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.site.trim().is_empty() {
            bail!("site must be non-empty");
        }
        if self.strategy.trim().is_empty() {
            bail!("strategy must be non-empty");
        }
        if self.server.trim().is_empty() {
            bail!("server must be non-empty");
        }
        if self.step_timeout_secs == 0 {
            bail!("step_timeout_secs must be > 0");
        }
        if self.output_limit_bytes == 0 {
            bail!("output_limit_bytes must be > 0");
        }
        for (label, collector) in [
            ("psi", &self.psi),
            ("geo", &self.geo),
            ("combined", &self.combined),
        ] {
            if collector.command.is_empty() || collector.command[0].trim().is_empty() {
                bail!("{label}.command must be a non-empty array");
            }
        }
        Ok(())
    }
}

/// Load settings from a TOML file.
///
/// If the file is missing, returns `Settings::default()`.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        let settings = Settings::default();
        settings.validate()?;
        return Ok(settings);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let settings: Settings =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let settings = load_settings(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("snapshot.toml");
        fs::write(
            &path,
            "site = \"shop.example\"\n\n[psi]\ncommand = [\"sh\", \"scripts/psi.sh\"]\n",
        )
        .expect("write");

        let settings = load_settings(&path).expect("load");
        assert_eq!(settings.site, "shop.example");
        assert_eq!(settings.psi.command, vec!["sh", "scripts/psi.sh"]);
        assert_eq!(settings.strategy, "mobile");
        assert_eq!(settings.geo, Settings::default().geo);
    }

    #[test]
    fn rejects_empty_collector_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("snapshot.toml");
        fs::write(&path, "[geo]\ncommand = []\n").expect("write");

        let err = load_settings(&path).expect_err("invalid settings");
        assert!(err.to_string().contains("geo.command"));
    }

    #[test]
    fn availability_checks_the_script_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let collector = CollectorCommand::new(&["python3", "scripts/collect_psi.py"]);
        assert!(!collector.is_available(root));

        fs::create_dir_all(root.join("scripts")).expect("scripts dir");
        fs::write(root.join("scripts/collect_psi.py"), "").expect("script");
        assert!(collector.is_available(root));

        // A bare program has no script file to probe.
        let bare = CollectorCommand::new(&["collect-psi"]);
        assert!(bare.is_available(root));
    }
}
