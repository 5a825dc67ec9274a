//! Diagnostic tracing on stderr.
//!
//! Reports, JSON exports and the scorecard are the product output; this
//! module only controls what the run narrates while it works.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "rankbot=info";

/// Install the global subscriber.
///
/// Reads `RUST_LOG`; falls back to `rankbot=info`. Compact format on stderr
/// so stdout stays free for the results table.
///
/// ```bash
/// RUST_LOG=rankbot=debug rankbot run --cohort c4
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
