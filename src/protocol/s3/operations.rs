//! Backend operations used by the object writer

use super::client::S3Client;
use super::error::S3Result;
use super::types::{
    CompleteUploadRequest, InitiateUploadRequest, PutObjectRequest, UploadPartRequest,
};
use async_trait::async_trait;

/// The object-store calls a [`MultipartObjectWriter`](super::MultipartObjectWriter) needs.
///
/// Every call is issued against [`bucket`](UploadOperations::bucket).
/// Implementations report failures as [`S3Error`](super::S3Error) with the
/// HTTP status and error code preserved, since commit failures are
/// classified from them.
#[async_trait]
pub trait UploadOperations: Send + Sync {
    /// Target bucket
    fn bucket(&self) -> &str;

    /// Whether the backend honors `If-None-Match` on writes
    fn supports_conditional_writes(&self) -> bool {
        true
    }

    /// Open a multipart session, returning its upload ID
    async fn initiate_multipart_upload(&self, request: InitiateUploadRequest)
        -> S3Result<String>;

    /// Upload one part, returning its ETag
    async fn upload_part(&self, request: UploadPartRequest) -> S3Result<String>;

    async fn complete_multipart_upload(&self, request: CompleteUploadRequest) -> S3Result<()>;

    /// Discard an open session and its parts
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> S3Result<()>;

    /// Single-call whole-object upload
    async fn put_object(&self, request: PutObjectRequest) -> S3Result<()>;

    async fn object_exists(&self, bucket: &str, key: &str) -> S3Result<bool>;
}

#[async_trait]
impl UploadOperations for S3Client {
    fn bucket(&self) -> &str {
        S3Client::bucket(self)
    }

    fn supports_conditional_writes(&self) -> bool {
        self.config().conditional_writes_supported
    }

    async fn initiate_multipart_upload(
        &self,
        request: InitiateUploadRequest,
    ) -> S3Result<String> {
        S3Client::initiate_multipart_upload(self, request).await
    }

    async fn upload_part(&self, request: UploadPartRequest) -> S3Result<String> {
        S3Client::upload_part(self, request).await
    }

    async fn complete_multipart_upload(&self, request: CompleteUploadRequest) -> S3Result<()> {
        S3Client::complete_multipart_upload(self, request).await
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> S3Result<()> {
        S3Client::abort_multipart_upload(self, key, upload_id).await
    }

    async fn put_object(&self, request: PutObjectRequest) -> S3Result<()> {
        S3Client::put_object(self, request).await
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> S3Result<bool> {
        self.exists(bucket, key).await
    }
}
