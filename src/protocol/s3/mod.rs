//! Streaming S3 object writer
//!
//! Turns a stream of byte chunks into exactly one durable S3 object. Small
//! objects are stored with a single PUT; larger ones go through a multipart
//! upload that is opened lazily once the first part fills up.
//!
//! # Features
//!
//! - Server-side encryption: S3-managed (AES256), KMS, or customer-provided keys
//! - Create-only commits with `If-None-Match: *` for exactly-once pipelines
//! - Commit failures classified into retriable, target-exists and fatal outcomes
//! - Best-effort abort of open multipart sessions on failure
//! - Support for custom endpoints (MinIO, LocalStack, etc.)
//!
//! # Examples
//!
//! ```ignore
//! use orbit_s3_stream::protocol::s3::{MultipartObjectWriter, S3Client, S3Config, WriterOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = S3Config::new("my-bucket".to_string());
//!     config.sse_algorithm = Some("AES256".to_string());
//!
//!     let options = WriterOptions::from_config(&config)?;
//!     let client = Arc::new(S3Client::new(config).await?);
//!
//!     let mut writer = MultipartObjectWriter::new(client, "topics/orders/0/orders+0+0000000000.json", options)?;
//!     writer.write(b"{\"id\":1}\n").await?;
//!     writer.commit().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod classify;
mod client;
mod config;
mod error;
mod multipart;
mod operations;
mod types;
mod writer;

#[cfg(test)]
mod mock;


// Re-export main types
pub use client::S3Client;
pub use config::{S3Config, S3ConfigBuilder, WriterOptions};
pub use error::{ErrorOrigin, S3Error, S3Result, WriterError, WriterResult};
pub use operations::UploadOperations;
pub use types::{
    CompleteUploadRequest, ConditionalWritePolicy, CustomerKey, EncryptionParams, EncryptionSpec,
    InitiateUploadRequest, KmsParams, ObjectMetadata, PutObjectRequest, S3StorageClass,
    SecretValue, UploadPartInfo, UploadPartRequest, UploadSession, WriterState,
    IF_NONE_MATCH_ANY,
};
pub use writer::MultipartObjectWriter;

/// Default part size (25 MiB)
pub const DEFAULT_PART_SIZE: usize = 25 * 1024 * 1024;

/// Maximum part size (5 GiB)
pub const MAX_PART_SIZE: usize = 5 * 1024 * 1024 * 1024;

/// Minimum part size required by S3 for every part but the last
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;
