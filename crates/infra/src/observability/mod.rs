//! Observability infrastructure
//!
//! Installs the process-wide `tracing` subscriber. Every other module logs
//! through the `tracing` macros with structured fields; secrets (verifiers,
//! authorization codes, tokens) are never recorded.

use authbroker_domain::{BrokerError, LogFormat, LoggingConfig, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber from configuration
///
/// `RUST_LOG` takes precedence over `config.level` when set.
///
/// # Errors
/// Returns `BrokerError::Config` if the level directive does not parse or a
/// global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_filter(&config.level)?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_thread_ids(true).with_level(true))
            .try_init(),
    };

    installed.map_err(|e| BrokerError::Config(format!("Failed to install tracing subscriber: {e}")))
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| BrokerError::Config(format!("Invalid log level '{level}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("authbroker_core=debug,tower_http=info").is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig { level: "warn".into(), format: LogFormat::Json };
        let first = init_tracing(&config);
        let second = init_tracing(&config);

        // Another test may have installed a subscriber first; the second
        // call must fail either way.
        let _ = first;
        assert!(matches!(second, Err(BrokerError::Config(_))));
    }
}
