//! Tracing subscriber setup shared by the binaries

use crate::config::LoggingConfig;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Directives from `RUST_LOG` apply, plus `target` at the configured level.
pub fn init(config: &LoggingConfig, target: &str) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("{}={}", target, config.level).parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialise logging: {}", e))
}
