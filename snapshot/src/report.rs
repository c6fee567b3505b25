//! Run report assembly and the append-only status log.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::collector::{Step, StepReport};

/// Which invocation path produced a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Preferred path: separate PSI and GEO collectors.
    Split,
    /// Fallback path: one combined snapshot collector.
    Combined,
}

/// Everything recorded about one run, persisted to `report.json` and
/// condensed into a single status log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    /// Run date stamp (`YYYY-MM-DD`), shared by the report file names.
    pub date: String,
    pub mode: RunMode,
    /// Completion time as it appears in the status log line.
    pub timestamp: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_secs: f64,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    /// Render the status log line for this run.
    ///
    /// Each invocation path has its own format: the split path logs each
    /// collector's exit code, the fallback path logs a single marker. A
    /// failed fallback logs `FAIL` with its code so the timestamp is
    /// present on every line.
    pub fn status_line(&self) -> String {
        match self.mode {
            RunMode::Split => format!(
                "{} PSI={} GEO={}",
                self.timestamp,
                self.step_code_label(Step::Psi),
                self.step_code_label(Step::Geo)
            ),
            RunMode::Combined => match self.step(Step::Snapshot) {
                Some(step) if step.success => format!("OK {}", self.timestamp),
                _ => format!(
                    "FAIL {} SNAPSHOT={}",
                    self.timestamp,
                    self.step_code_label(Step::Snapshot)
                ),
            },
        }
    }

    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|report| report.step == step)
    }

    fn step_code_label(&self, step: Step) -> String {
        self.step(step)
            .map_or_else(|| "none".to_string(), StepReport::code_label)
    }
}

/// Append one line to the status log. The log is never truncated or
/// rewritten by the runner.
pub fn append_status_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open status log {}", path.display()))?;
    writeln!(file, "{line}").with_context(|| format!("append status log {}", path.display()))?;
    Ok(())
}

/// Serialize the run report to pretty-printed JSON with trailing newline.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report directory {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(report).context("serialize report")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write report {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(step: Step, exit_code: Option<i32>, success: bool) -> StepReport {
        StepReport {
            step,
            exit_code,
            success,
            timed_out: false,
            error: None,
            duration_ms: 12,
        }
    }

    fn report(mode: RunMode, steps: Vec<StepReport>) -> RunReport {
        RunReport {
            run_id: "snap-20260804_021000".to_string(),
            date: "2026-08-04".to_string(),
            mode,
            timestamp: "2026-08-04 02:10:07".to_string(),
            started_at: "2026-08-04T02:10:00+02:00".to_string(),
            finished_at: "2026-08-04T02:10:07+02:00".to_string(),
            duration_secs: 7.0,
            steps,
        }
    }

    #[test]
    fn split_line_lists_both_codes() {
        let report = report(
            RunMode::Split,
            vec![step(Step::Psi, Some(0), true), step(Step::Geo, Some(2), false)],
        );
        assert_eq!(report.status_line(), "2026-08-04 02:10:07 PSI=0 GEO=2");
    }

    #[test]
    fn split_line_renders_missing_code_as_none() {
        let report = report(
            RunMode::Split,
            vec![step(Step::Psi, None, false), step(Step::Geo, Some(0), true)],
        );
        assert_eq!(report.status_line(), "2026-08-04 02:10:07 PSI=none GEO=0");
    }

    #[test]
    fn combined_success_logs_ok_marker() {
        let report = report(RunMode::Combined, vec![step(Step::Snapshot, Some(0), true)]);
        assert_eq!(report.status_line(), "OK 2026-08-04 02:10:07");
    }

    #[test]
    fn combined_failure_logs_fail_with_code() {
        let report = report(RunMode::Combined, vec![step(Step::Snapshot, Some(3), false)]);
        assert_eq!(
            report.status_line(),
            "FAIL 2026-08-04 02:10:07 SNAPSHOT=3"
        );
    }

    #[test]
    fn status_log_appends_without_rewriting() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("logs/snapshot.log");

        append_status_line(&path, "2026-08-03 02:10:05 PSI=0 GEO=0").expect("first");
        append_status_line(&path, "2026-08-04 02:10:07 PSI=0 GEO=1").expect("second");

        let contents = fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("2026-08-03"));
        assert!(lines[1].contains("GEO=1"));
    }

    #[test]
    fn report_json_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("runs/snap-1/report.json");
        let original = report(RunMode::Split, vec![step(Step::Psi, Some(0), true)]);

        write_report(&path, &original).expect("write");
        let contents = fs::read_to_string(&path).expect("read");
        assert!(contents.ends_with('\n'));
        let loaded: RunReport = serde_json::from_str(&contents).expect("parse");
        assert_eq!(loaded.run_id, original.run_id);
        assert_eq!(loaded.steps.len(), 1);
    }
}
