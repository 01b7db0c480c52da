//! Multipart upload calls against S3

use super::client::S3Client;
use super::error::{S3Error, S3Result};
use super::types::{CompleteUploadRequest, InitiateUploadRequest, UploadPartRequest};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};

impl S3Client {
    /// Initiate a multipart upload, returning its upload ID
    pub async fn initiate_multipart_upload(
        &self,
        request: InitiateUploadRequest,
    ) -> S3Result<String> {
        let encryption = &request.encryption;
        let kms = encryption.kms.as_ref();
        let customer_key = encryption.customer_key.as_ref();

        let response = self
            .aws_client()
            .create_multipart_upload()
            .bucket(self.bucket())
            .key(&request.key)
            .storage_class(request.storage_class.to_aws())
            .set_acl(request.acl.as_deref().map(ObjectCannedAcl::from))
            .set_content_type(request.content_type.clone())
            .set_server_side_encryption(encryption.server_side_encryption())
            .set_ssekms_key_id(kms.map(|k| k.key_id.clone()))
            .set_ssekms_encryption_context(kms.and_then(|k| k.context.clone()))
            .set_sse_customer_algorithm(customer_key.map(|k| k.algorithm().to_string()))
            .set_sse_customer_key(customer_key.map(|k| k.key().to_string()))
            .set_sse_customer_key_md5(customer_key.map(|k| k.key_md5().to_string()))
            .send()
            .await
            .map_err(S3Error::from)?;

        response
            .upload_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| S3Error::MultipartUpload("No upload ID returned".to_string()))
            .map(|s| s.to_string())
    }

    /// Upload a single part, returning its ETag
    pub async fn upload_part(&self, request: UploadPartRequest) -> S3Result<String> {
        let customer_key = request.customer_key.as_ref();

        let response = self
            .aws_client()
            .upload_part()
            .bucket(self.bucket())
            .key(&request.key)
            .upload_id(&request.upload_id)
            .part_number(request.part_number)
            .set_sse_customer_algorithm(customer_key.map(|k| k.algorithm().to_string()))
            .set_sse_customer_key(customer_key.map(|k| k.key().to_string()))
            .set_sse_customer_key_md5(customer_key.map(|k| k.key_md5().to_string()))
            .body(ByteStream::from(request.body))
            .send()
            .await
            .map_err(S3Error::from)?;

        response
            .e_tag()
            .ok_or_else(|| S3Error::MultipartUpload("No ETag returned for part".to_string()))
            .map(|s| s.to_string())
    }

    /// Complete a multipart upload
    pub async fn complete_multipart_upload(&self, request: CompleteUploadRequest) -> S3Result<()> {
        let completed_parts: Vec<CompletedPart> = request
            .parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.etag)
                    .build()
            })
            .collect();

        let multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.aws_client()
            .complete_multipart_upload()
            .bucket(self.bucket())
            .key(&request.key)
            .upload_id(&request.upload_id)
            .multipart_upload(multipart_upload)
            .set_if_none_match(request.if_none_match)
            .send()
            .await
            .map_err(S3Error::from)?;

        Ok(())
    }

    /// Abort a multipart upload
    pub async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> S3Result<()> {
        self.aws_client()
            .abort_multipart_upload()
            .bucket(self.bucket())
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(S3Error::from)?;

        Ok(())
    }
}
