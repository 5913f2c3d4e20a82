//! Logging initialization.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install a console subscriber. `RUST_LOG` wins over `default_level` when set.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .with(filter)
        .init();
}
