//! Development-time tracing for debugging the runner.
//!
//! Tracing here is dev diagnostics only, controlled by `RUST_LOG` and sent
//! to stderr. The status log appended by [`crate::report`] is the product
//! artifact: always written, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn` so scheduled runs stay quiet on
/// stderr unless something is off.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
