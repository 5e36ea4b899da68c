//! Tracing subscriber setup
//!
//! `RUST_LOG` always overrides the configured level. Output goes to stderr
//! unless a log file is configured, so stdout stays free for the meter.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter directive for a crate from a configured level.
///
/// A bare level such as `debug` is scoped to `crate_name`; anything that
/// already looks like a directive (contains `=` or `,`) is used verbatim.
pub fn filter_directive(crate_name: &str, level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("{}={}", crate_name, level)
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
/// - Log file cannot be opened
/// - A global subscriber is already installed
pub fn init(crate_name: &str, config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(crate_name, &config.level)));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false),
                )
                .try_init()
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_is_scoped() {
        assert_eq!(filter_directive("panmeter", "debug"), "panmeter=debug");
    }

    #[test]
    fn test_directive_passes_through() {
        assert_eq!(
            filter_directive("panmeter", "panmeter=trace,cpal=warn"),
            "panmeter=trace,cpal=warn"
        );
    }
}
