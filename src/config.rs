/*!
 * Configuration types for the streaming uploader
 */

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::path::PathBuf;

use crate::error::Result;
use crate::protocol::s3::S3Config;

/// Top-level configuration: logging plus the S3 target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Target bucket and writer settings
    #[serde(default)]
    pub s3: S3Config,
}

impl StreamConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: StreamConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    ///
    /// A customer-provided encryption key is never written out.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(!config.verbose);
        assert!(config.s3.bucket.is_empty());
    }

    #[test]
    fn test_config_roundtrip_through_file() {
        let mut config = StreamConfig::default();
        config.log_level = LogLevel::Debug;
        config.s3.bucket = "my-bucket".to_string();
        config.s3.sse_algorithm = Some("aws:kms".to_string());
        config.s3.sse_kms_key_id = Some("key1".to_string());

        let file = NamedTempFile::new().unwrap();
        config.to_file(file.path()).unwrap();
        let loaded = StreamConfig::from_file(file.path()).unwrap();

        assert_eq!(loaded.log_level, LogLevel::Debug);
        assert_eq!(loaded.s3.bucket, "my-bucket");
        assert_eq!(loaded.s3.sse_kms_key_id.as_deref(), Some("key1"));
    }

    #[test]
    fn test_missing_file() {
        assert!(StreamConfig::from_file(Path::new("/nonexistent/orbit-s3-stream.toml")).is_err());
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
