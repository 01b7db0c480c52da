/*!
 * Orbit S3 Stream - streaming object writer for S3
 *
 * Turns an ordered stream of byte chunks into exactly one durable object:
 * - Single PUT for small objects, lazy multipart upload for large ones
 * - Server-side encryption (AES256, KMS, customer-provided keys)
 * - Create-only commits with `If-None-Match: *`
 * - Commit failures classified into retriable, target-exists and fatal outcomes
 */

pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;

// Re-export commonly used types
pub use config::{LogLevel, StreamConfig};
pub use error::{OrbitError, Result};
pub use protocol::s3::{
    MultipartObjectWriter, S3Client, S3Config, UploadOperations, WriterError, WriterOptions,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
