/*!
 * Error types for the streaming uploader
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::protocol::s3::{S3Error, WriterError};

pub type Result<T> = std::result::Result<T, OrbitError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_TARGET_EXISTS: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug)]
pub enum OrbitError {
    /// Input file not found
    SourceNotFound(PathBuf),

    /// I/O error
    Io(io::Error),

    /// Configuration error
    Config(String),

    /// S3 client setup or call failed
    S3(S3Error),

    /// The object write failed
    Write(WriterError),
}

impl OrbitError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // Another writer produced the object first; nothing to do
            OrbitError::Write(WriterError::TargetExists { .. }) => EXIT_TARGET_EXISTS,
            _ => EXIT_FATAL,
        }
    }
}

impl fmt::Display for OrbitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrbitError::SourceNotFound(path) => {
                write!(f, "Source not found: {}", path.display())
            }
            OrbitError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            OrbitError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            OrbitError::S3(err) => {
                write!(f, "S3 error: {}", err)
            }
            OrbitError::Write(err) => {
                write!(f, "Write failed: {}", err)
            }
        }
    }
}

impl std::error::Error for OrbitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrbitError::Io(err) => Some(err),
            OrbitError::S3(err) => Some(err),
            OrbitError::Write(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for OrbitError {
    fn from(err: io::Error) -> Self {
        OrbitError::Io(err)
    }
}

impl From<S3Error> for OrbitError {
    fn from(err: S3Error) -> Self {
        OrbitError::S3(err)
    }
}

impl From<WriterError> for OrbitError {
    fn from(err: WriterError) -> Self {
        OrbitError::Write(err)
    }
}

impl From<toml::de::Error> for OrbitError {
    fn from(err: toml::de::Error) -> Self {
        OrbitError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for OrbitError {
    fn from(err: toml::ser::Error) -> Self {
        OrbitError::Config(format!("TOML serialize error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(EXIT_SUCCESS, 0);
        assert_eq!(EXIT_TARGET_EXISTS, 1);
        assert_eq!(EXIT_FATAL, 2);
    }

    #[test]
    fn test_exit_code_mapping() {
        let exists = OrbitError::Write(WriterError::TargetExists {
            bucket: "b".to_string(),
            key: "k".to_string(),
        });
        assert_eq!(exists.exit_code(), EXIT_TARGET_EXISTS);

        let fault = OrbitError::Write(WriterError::ConsistencyFault {
            bucket: "b".to_string(),
            key: "k".to_string(),
            message: "missing".to_string(),
        });
        assert_eq!(fault.exit_code(), EXIT_FATAL);
        assert_eq!(OrbitError::Config("bad".to_string()).exit_code(), EXIT_FATAL);
    }

    #[test]
    fn test_display() {
        let err = OrbitError::Write(WriterError::TargetExists {
            bucket: "b".to_string(),
            key: "k".to_string(),
        });
        assert_eq!(err.to_string(), "Write failed: Object already exists: b/k");
    }
}
