//! Logging configuration.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset: INFO for meshbed, WARN for dependencies.
const DEFAULT_FILTER: &str = "meshbed_harness=info,meshbed=info,warn";
const VERBOSE_FILTER: &str = "meshbed_harness=debug,meshbed=debug,warn";

/// Initialize tracing to stderr.
///
/// `verbose` raises meshbed's own targets to DEBUG, which includes full command output.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(VERBOSE_FILTER)
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();
}
