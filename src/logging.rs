/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::StreamConfig;
use crate::error::{OrbitError, Result};

/// Initialize structured logging based on configuration
pub fn init_logging(config: &StreamConfig) -> Result<()> {
    let env_filter = build_filter(config)?;

    if let Some(ref log_path) = config.log_file {
        init_file_logging(log_path, env_filter)?;
    } else {
        init_stderr_logging(env_filter);
    }

    Ok(())
}

/// Effective level: `verbose` forces debug
fn effective_level(config: &StreamConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    }
}

fn build_filter(config: &StreamConfig) -> Result<EnvFilter> {
    let log_level = effective_level(config);

    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("orbit_s3_stream={}", log_level)))
        .map_err(|e| OrbitError::Config(format!("Failed to create log filter: {}", e)))
}

/// Initialize logging to stderr, leaving stdout for data
fn init_stderr_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Initialize logging to a file
fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    let file = File::create(log_path)
        .map_err(|e| OrbitError::Config(format!("Failed to create log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false) // No ANSI colors in file
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_verbose_overrides_log_level() {
        let config = StreamConfig {
            log_level: LogLevel::Error,
            verbose: true,
            ..Default::default()
        };

        assert_eq!(effective_level(&config), Level::DEBUG);
    }

    #[test]
    fn test_configured_level() {
        let config = StreamConfig {
            log_level: LogLevel::Warn,
            ..Default::default()
        };

        assert_eq!(effective_level(&config), Level::WARN);
    }

    #[test]
    fn test_filter_builds() {
        let config = StreamConfig::default();
        assert!(build_filter(&config).is_ok());
    }
}
