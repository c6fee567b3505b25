//! Scheduled snapshot runner for the PSI and GEO collectors.
//!
//! One invocation prepares the collector environment, makes sure the
//! output directories exist, runs the PSI collector and then the GEO
//! collector with date-stamped output paths, and appends a single status
//! line recording both exit codes. When the per-collector scripts are not
//! present, a combined fallback collector covers both snapshots in one
//! process.
//!
//! The collectors are opaque external programs; this crate owns only the
//! orchestration around them. Ambient process state is kept explicit: the
//! runner takes a [`settings::Settings`] struct and builds child
//! environments as maps instead of mutating its own environment, so every
//! step is testable against a scripted [`collector::CollectorRunner`].

pub mod collector;
pub mod env_file;
pub mod exit_codes;
pub mod layout;
pub mod logging;
pub mod process;
pub mod report;
pub mod rotate;
pub mod run;
pub mod settings;
