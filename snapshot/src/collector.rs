//! Collector steps and the process-backed runner that executes them.
//!
//! The [`CollectorRunner`] trait decouples run orchestration from actual
//! subprocess execution; tests use scripted runners that return
//! predetermined reports without spawning anything.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::process::{CommandOutput, run_with_timeout};

/// Identity of one collection step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Psi,
    Geo,
    /// Combined fallback collector covering both snapshots in one process.
    Snapshot,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Step::Psi => "psi",
            Step::Geo => "geo",
            Step::Snapshot => "snapshot",
        }
    }
}

/// One collector invocation, fully resolved.
#[derive(Debug, Clone)]
pub struct StepRequest {
    pub step: Step,
    /// Program plus arguments; the first element is the program.
    pub command: Vec<String>,
    /// Working directory for the collector process.
    pub workdir: PathBuf,
    /// Extra environment for the collector (env file plus the root pointer).
    pub env: BTreeMap<String, String>,
    /// Where to write the captured stdout/stderr of this step.
    pub capture_log_path: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

/// Captured result of one step.
///
/// A failed collector is data, not an error: the run records the failure
/// and moves on to the next step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    /// Child exit code; `None` when the child was killed or never spawned.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub timed_out: bool,
    /// Spawn or wait failure, when the step produced no exit status of its own.
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl StepReport {
    /// Exit status as it appears in the status log line.
    pub fn code_label(&self) -> String {
        match self.exit_code {
            Some(code) => code.to_string(),
            None => "none".to_string(),
        }
    }
}

/// Abstraction over collector execution backends.
pub trait CollectorRunner {
    fn run(&self, request: &StepRequest) -> Result<StepReport>;
}

/// Runner that spawns the configured collector command.
pub struct ProcessCollectorRunner;

impl CollectorRunner for ProcessCollectorRunner {
    #[instrument(skip_all, fields(step = request.step.label()))]
    fn run(&self, request: &StepRequest) -> Result<StepReport> {
        info!(command = ?request.command, "starting collector");
        let started = Instant::now();

        let mut cmd = Command::new(&request.command[0]);
        cmd.args(&request.command[1..])
            .current_dir(&request.workdir);
        for (key, value) in &request.env {
            cmd.env(key, value);
        }

        let report = match run_with_timeout(cmd, request.timeout, request.output_limit_bytes) {
            Ok(output) => {
                write_capture_log(&request.capture_log_path, &output)?;
                report_from_output(request.step, &output, started.elapsed())
            }
            Err(err) => {
                // A collector that cannot start is recorded like one that failed.
                warn!(err = %err, "collector did not run");
                write_capture_failure(&request.capture_log_path, &err)?;
                StepReport {
                    step: request.step,
                    exit_code: None,
                    success: false,
                    timed_out: false,
                    error: Some(format!("{err:#}")),
                    duration_ms: elapsed_ms(started.elapsed()),
                }
            }
        };

        info!(
            exit_code = ?report.exit_code,
            success = report.success,
            timed_out = report.timed_out,
            "collector finished"
        );
        Ok(report)
    }
}

fn report_from_output(step: Step, output: &CommandOutput, elapsed: Duration) -> StepReport {
    StepReport {
        step,
        exit_code: output.status.code(),
        success: output.status.success() && !output.timed_out,
        timed_out: output.timed_out,
        error: output
            .timed_out
            .then(|| "collector timed out".to_string()),
        duration_ms: elapsed_ms(elapsed),
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    elapsed.as_millis() as u64
}

fn write_capture_log(path: &Path, output: &CommandOutput) -> Result<()> {
    let mut buf = String::new();
    buf.push_str("=== stdout ===\n");
    buf.push_str(&String::from_utf8_lossy(&output.stdout));
    buf.push_str("\n=== stderr ===\n");
    buf.push_str(&String::from_utf8_lossy(&output.stderr));
    if output.dropped_bytes > 0 {
        buf.push_str(&format!("\n[dropped {} bytes]\n", output.dropped_bytes));
    }
    if output.timed_out {
        buf.push_str("\n[collector timed out]\n");
    }
    write_capture(path, &buf)
}

fn write_capture_failure(path: &Path, err: &anyhow::Error) -> Result<()> {
    write_capture(path, &format!("[collector did not run: {err:#}]\n"))
}

fn write_capture(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create capture log dir {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write capture log {}", path.display()))
}
