//! Diagnostic tracing for the loop.
//!
//! Tracing output goes to stderr and is controlled by `RUST_LOG`. Progress
//! lines meant for the operator are printed by the binary on stdout and are
//! unaffected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "autofix=info";

/// Initialize the tracing subscriber.
///
/// # Example
/// ```bash
/// RUST_LOG=autofix=debug autofix run
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
