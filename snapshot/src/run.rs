//! End-to-end orchestration of one snapshot run.
//!
//! Coordinates environment assembly, directory creation, collector
//! invocation, and outcome recording. The sequence is strictly linear;
//! the only branch is the split-vs-fallback choice made before the first
//! collector starts.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, info, instrument, warn};

use crate::collector::{CollectorRunner, Step, StepRequest};
use crate::env_file::load_env_file;
use crate::layout::RunLayout;
use crate::report::{RunMode, RunReport, append_status_line, write_report};
use crate::settings::Settings;

/// Environment variable pointing collectors at the workspace root.
pub const ROOT_ENV_VAR: &str = "SNAPSHOT_ROOT";

/// Run one snapshot end-to-end and record the outcome.
///
/// Collector failures are captured into the report and the status log;
/// only runner-owned failures (unreadable env file, unwritable artifacts)
/// come back as errors. The runner never mutates its own environment:
/// everything the collectors need is passed in their env maps.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn run_snapshot<R: CollectorRunner>(
    root: &Path,
    settings: &Settings,
    runner: &R,
) -> Result<RunReport> {
    let started = Local::now();
    let date = started.date_naive();
    let run_id = format!("snap-{}", started.format("%Y%m%d_%H%M%S"));
    info!(run_id = %run_id, "snapshot run started");

    let layout = RunLayout::new(root, settings, date);
    layout.ensure_dirs()?;

    let child_env = collector_env(root, settings)?;
    let run_dir = layout.run_dir(&run_id);

    let mode = if settings.psi.is_available(root) && settings.geo.is_available(root) {
        RunMode::Split
    } else {
        info!("preferred collector scripts missing, using combined fallback");
        RunMode::Combined
    };

    let requests = match mode {
        RunMode::Split => vec![
            step_request(Step::Psi, psi_command(settings, &layout), root, settings, &child_env, &run_dir),
            step_request(Step::Geo, geo_command(settings, &layout), root, settings, &child_env, &run_dir),
        ],
        RunMode::Combined => vec![step_request(
            Step::Snapshot,
            combined_command(settings),
            root,
            settings,
            &child_env,
            &run_dir,
        )],
    };

    // Every step runs regardless of what the previous one returned.
    let mut steps = Vec::with_capacity(requests.len());
    for request in &requests {
        steps.push(runner.run(request)?);
    }

    let finished = Local::now();
    let report = RunReport {
        run_id,
        date: date.format("%Y-%m-%d").to_string(),
        mode,
        timestamp: finished.format("%Y-%m-%d %H:%M:%S").to_string(),
        started_at: started.to_rfc3339(),
        finished_at: finished.to_rfc3339(),
        duration_secs: (finished - started).num_milliseconds() as f64 / 1000.0,
        steps,
    };

    append_status_line(&layout.status_log_path, &report.status_line())?;
    write_report(&run_dir.join("report.json"), &report)?;

    info!(run_id = %report.run_id, line = %report.status_line(), "snapshot run recorded");
    Ok(report)
}

/// Build the collector environment: env file contents, the root pointer,
/// and the project virtualenv's `bin/` at the front of PATH when present.
fn collector_env(root: &Path, settings: &Settings) -> Result<BTreeMap<String, String>> {
    let mut vars = load_env_file(&root.join(&settings.env_file))?;
    vars.insert(ROOT_ENV_VAR.to_string(), root.display().to_string());

    let venv = root.join(&settings.venv_dir);
    let venv_bin = venv.join("bin");
    if venv_bin.is_dir() {
        let mut paths = vec![venv_bin];
        paths.extend(env::split_paths(&env::var_os("PATH").unwrap_or_default()));
        let joined = env::join_paths(paths).context("join PATH entries")?;
        vars.insert("PATH".to_string(), joined.to_string_lossy().into_owned());
        vars.insert("VIRTUAL_ENV".to_string(), venv.display().to_string());
    } else {
        warn!(path = %venv_bin.display(), "virtualenv not found, collectors use system interpreters");
    }

    debug!(count = vars.len(), "collector environment assembled");
    Ok(vars)
}

fn step_request(
    step: Step,
    command: Vec<String>,
    root: &Path,
    settings: &Settings,
    child_env: &BTreeMap<String, String>,
    run_dir: &Path,
) -> StepRequest {
    StepRequest {
        step,
        command,
        workdir: root.to_path_buf(),
        env: child_env.clone(),
        capture_log_path: run_dir.join(format!("{}.log", step.label())),
        timeout: Duration::from_secs(settings.step_timeout_secs),
        output_limit_bytes: settings.output_limit_bytes,
    }
}

fn psi_command(settings: &Settings, layout: &RunLayout) -> Vec<String> {
    let mut command = settings.psi.command.clone();
    command.extend([
        "--infile".to_string(),
        settings.urls_file.display().to_string(),
        "--out".to_string(),
        layout.psi_report_path.display().to_string(),
        "--strategy".to_string(),
        settings.strategy.clone(),
        "--server".to_string(),
        settings.server.clone(),
    ]);
    command
}

fn geo_command(settings: &Settings, layout: &RunLayout) -> Vec<String> {
    let mut command = settings.geo.command.clone();
    command.extend([
        "--queries".to_string(),
        settings.queries_file.display().to_string(),
        "--site".to_string(),
        settings.site.clone(),
        "--out".to_string(),
        layout.geo_report_path.display().to_string(),
        "--server".to_string(),
        settings.server.clone(),
    ]);
    command
}

fn combined_command(settings: &Settings) -> Vec<String> {
    let mut command = settings.combined.command.clone();
    command.extend([
        "--urls".to_string(),
        settings.urls_file.display().to_string(),
        "--queries".to_string(),
        settings.queries_file.display().to_string(),
        "--site".to_string(),
        settings.site.clone(),
        "--db".to_string(),
        settings.db_file.display().to_string(),
        "--server".to_string(),
        settings.server.clone(),
    ]);
    command
}
