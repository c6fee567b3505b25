//! Stable exit codes for the snapshot CLI.

/// The runner's own work completed. Collector failures are recorded in the
/// status log and do not change this.
pub const OK: i32 = 0;
/// Invalid settings or a runner-owned I/O failure (unwritable log, bad
/// settings file).
pub const INVALID: i32 = 1;
