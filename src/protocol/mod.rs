/*!
 * Protocol layer
 *
 * Object-store backends the writer can target. S3 and S3-compatible
 * services (MinIO, LocalStack) are supported.
 */

pub mod s3;
