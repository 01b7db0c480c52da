//! Type definitions for S3 streaming uploads

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Value of the `If-None-Match` header for create-only writes
pub const IF_NONE_MATCH_ANY: &str = "*";

/// S3 storage classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum S3StorageClass {
    /// Standard storage class
    #[default]
    Standard,

    /// Reduced redundancy (deprecated but still available)
    ReducedRedundancy,

    /// Infrequent access
    StandardIa,

    /// One zone infrequent access
    OnezoneIa,

    /// Intelligent tiering
    IntelligentTiering,

    /// Glacier instant retrieval
    GlacierInstantRetrieval,

    /// Glacier flexible retrieval
    GlacierFlexibleRetrieval,

    /// Glacier deep archive
    GlacierDeepArchive,
}

impl S3StorageClass {
    /// Convert to AWS SDK storage class
    pub fn to_aws(&self) -> aws_sdk_s3::types::StorageClass {
        match self {
            S3StorageClass::Standard => aws_sdk_s3::types::StorageClass::Standard,
            S3StorageClass::ReducedRedundancy => aws_sdk_s3::types::StorageClass::ReducedRedundancy,
            S3StorageClass::StandardIa => aws_sdk_s3::types::StorageClass::StandardIa,
            S3StorageClass::OnezoneIa => aws_sdk_s3::types::StorageClass::OnezoneIa,
            S3StorageClass::IntelligentTiering => {
                aws_sdk_s3::types::StorageClass::IntelligentTiering
            }
            S3StorageClass::GlacierInstantRetrieval => aws_sdk_s3::types::StorageClass::GlacierIr,
            S3StorageClass::GlacierFlexibleRetrieval => aws_sdk_s3::types::StorageClass::Glacier,
            S3StorageClass::GlacierDeepArchive => aws_sdk_s3::types::StorageClass::DeepArchive,
        }
    }
}

impl fmt::Display for S3StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            S3StorageClass::Standard => write!(f, "STANDARD"),
            S3StorageClass::ReducedRedundancy => write!(f, "REDUCED_REDUNDANCY"),
            S3StorageClass::StandardIa => write!(f, "STANDARD_IA"),
            S3StorageClass::OnezoneIa => write!(f, "ONEZONE_IA"),
            S3StorageClass::IntelligentTiering => write!(f, "INTELLIGENT_TIERING"),
            S3StorageClass::GlacierInstantRetrieval => write!(f, "GLACIER_IR"),
            S3StorageClass::GlacierFlexibleRetrieval => write!(f, "GLACIER"),
            S3StorageClass::GlacierDeepArchive => write!(f, "DEEP_ARCHIVE"),
        }
    }
}

/// A secret string from configuration, redacted in `Debug` output
pub struct SecretValue(SecretString);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::new(value.into().into_boxed_str()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretValue {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// A validated SSE-C key: base64 of exactly 256 bits
#[derive(Clone)]
pub struct CustomerKey {
    key: SecretValue,
    key_md5: String,
}

impl CustomerKey {
    /// The only algorithm S3 accepts for customer-provided keys
    pub const ALGORITHM: &'static str = "AES256";

    /// Decode and check a base64 key, deriving its MD5 digest
    pub fn from_base64(encoded: &str) -> Result<Self, String> {
        let encoded = encoded.trim();
        let raw = BASE64
            .decode(encoded)
            .map_err(|e| format!("customer key is not valid base64: {}", e))?;
        if raw.len() != 32 {
            return Err(format!(
                "customer key must decode to 32 bytes, got {}",
                raw.len()
            ));
        }

        Ok(Self {
            key: SecretValue::new(encoded),
            key_md5: BASE64.encode(Md5::digest(&raw)),
        })
    }

    pub fn algorithm(&self) -> &'static str {
        Self::ALGORITHM
    }

    /// Base64-encoded key material
    pub fn key(&self) -> &str {
        self.key.expose()
    }

    /// Base64-encoded MD5 of the decoded key
    pub fn key_md5(&self) -> &str {
        &self.key_md5
    }
}

impl fmt::Debug for CustomerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomerKey")
            .field("key", &self.key)
            .field("key_md5", &self.key_md5)
            .finish()
    }
}

/// Resolved server-side encryption for an upload
#[derive(Debug, Clone, Default)]
pub enum EncryptionSpec {
    /// Bucket default, nothing attached
    #[default]
    None,

    /// S3-managed keys (`x-amz-server-side-encryption: AES256`)
    Aes256,

    /// KMS-managed key
    Kms {
        key_id: String,
        context: Option<String>,
    },

    /// Customer-provided key (SSE-C)
    CustomerKey(CustomerKey),
}

impl EncryptionSpec {
    /// Resolve encryption settings from raw configuration values.
    ///
    /// Precedence: KMS (requires a key id), then a customer key, then
    /// AES256, then none. The algorithm name is matched case-insensitively
    /// and accepts `AES256`, `aws:kms` and `KMS`.
    pub fn resolve(
        algorithm: Option<&str>,
        kms_key_id: Option<&str>,
        kms_context: Option<&str>,
        customer_key: Option<&str>,
    ) -> Result<Self, String> {
        let algorithm = algorithm.map(str::trim).filter(|a| !a.is_empty());
        let customer_key = customer_key.map(str::trim).filter(|k| !k.is_empty());

        let is_kms = match algorithm {
            None => false,
            Some(a) if a.eq_ignore_ascii_case("AES256") => false,
            Some(a) if a.eq_ignore_ascii_case("aws:kms") || a.eq_ignore_ascii_case("KMS") => true,
            Some(other) => {
                return Err(format!(
                    "unsupported server-side encryption algorithm: {}",
                    other
                ))
            }
        };

        if is_kms {
            if customer_key.is_some() {
                return Err("a customer-provided key cannot be combined with KMS encryption".into());
            }
            let key_id = kms_key_id
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .ok_or_else(|| "KMS encryption requires a KMS key id".to_string())?;
            return Ok(EncryptionSpec::Kms {
                key_id: key_id.to_string(),
                context: kms_context
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            });
        }

        if let Some(key) = customer_key {
            return CustomerKey::from_base64(key).map(EncryptionSpec::CustomerKey);
        }

        Ok(match algorithm {
            Some(_) => EncryptionSpec::Aes256,
            None => EncryptionSpec::None,
        })
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            EncryptionSpec::None => "none",
            EncryptionSpec::Aes256 => "AES256",
            EncryptionSpec::Kms { .. } => "aws:kms",
            EncryptionSpec::CustomerKey(_) => "SSE-C",
        }
    }

    /// The customer key that every part upload must repeat, if any
    pub fn customer_key(&self) -> Option<&CustomerKey> {
        match self {
            EncryptionSpec::CustomerKey(key) => Some(key),
            _ => None,
        }
    }

    /// Encryption parameter groups to attach to a create request
    pub fn params(&self) -> EncryptionParams {
        match self {
            EncryptionSpec::None => EncryptionParams::default(),
            EncryptionSpec::Aes256 => EncryptionParams {
                object_metadata: Some(ObjectMetadata {
                    sse_algorithm: "AES256".to_string(),
                }),
                ..Default::default()
            },
            EncryptionSpec::Kms { key_id, context } => EncryptionParams {
                kms: Some(KmsParams {
                    key_id: key_id.clone(),
                    context: context.clone(),
                }),
                ..Default::default()
            },
            EncryptionSpec::CustomerKey(key) => EncryptionParams {
                customer_key: Some(key.clone()),
                ..Default::default()
            },
        }
    }
}

/// Object metadata carrying a generic server-side encryption algorithm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub sse_algorithm: String,
}

/// KMS key parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmsParams {
    pub key_id: String,
    /// Base64-encoded JSON encryption context
    pub context: Option<String>,
}

/// The three mutually exclusive encryption parameter groups of a request.
/// At most one is set.
#[derive(Debug, Clone, Default)]
pub struct EncryptionParams {
    pub object_metadata: Option<ObjectMetadata>,
    pub kms: Option<KmsParams>,
    pub customer_key: Option<CustomerKey>,
}

impl EncryptionParams {
    pub fn is_empty(&self) -> bool {
        self.object_metadata.is_none() && self.kms.is_none() && self.customer_key.is_none()
    }

    /// `x-amz-server-side-encryption` value
    pub fn server_side_encryption(&self) -> Option<aws_sdk_s3::types::ServerSideEncryption> {
        if self.kms.is_some() {
            Some(aws_sdk_s3::types::ServerSideEncryption::AwsKms)
        } else {
            self.object_metadata
                .as_ref()
                .map(|m| aws_sdk_s3::types::ServerSideEncryption::from(m.sse_algorithm.as_str()))
        }
    }
}

/// Request to open a multipart upload session
#[derive(Debug, Clone)]
pub struct InitiateUploadRequest {
    pub key: String,
    pub encryption: EncryptionParams,
    pub storage_class: S3StorageClass,
    pub acl: Option<String>,
    pub content_type: Option<String>,
}

/// Request to upload one part of an open session
#[derive(Debug, Clone)]
pub struct UploadPartRequest {
    pub key: String,
    pub upload_id: String,
    /// 1-based part number
    pub part_number: i32,
    pub body: Bytes,
    pub customer_key: Option<CustomerKey>,
}

/// Request to assemble uploaded parts into the final object
#[derive(Debug, Clone)]
pub struct CompleteUploadRequest {
    pub key: String,
    pub upload_id: String,
    /// Parts in ascending part-number order
    pub parts: Vec<UploadPartInfo>,
    pub if_none_match: Option<String>,
}

/// Request to store a whole object in one call
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub key: String,
    pub body: Bytes,
    pub encryption: EncryptionParams,
    pub storage_class: S3StorageClass,
    pub acl: Option<String>,
    pub content_type: Option<String>,
    pub if_none_match: Option<String>,
}

/// Create-only write policy.
///
/// The `If-None-Match` precondition is attached only when conditional writes
/// are enabled *and* a rotation schedule interval is configured; an enabled
/// flag alone has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConditionalWritePolicy {
    pub enabled: bool,
    pub rotate_schedule_interval: Option<Duration>,
}

impl ConditionalWritePolicy {
    pub fn new(enabled: bool, rotate_schedule_interval_ms: Option<u64>) -> Self {
        Self {
            enabled,
            rotate_schedule_interval: rotate_schedule_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
        }
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.rotate_schedule_interval.is_some()
    }

    /// Header value for commit requests
    pub fn if_none_match(&self) -> Option<String> {
        self.is_active().then(|| IF_NONE_MATCH_ANY.to_string())
    }
}

/// Lifecycle state of an object writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Nothing written yet
    Empty,

    /// Bytes held locally, no backend session
    Buffering,

    /// A multipart session is open
    MultipartActive,

    /// The object is durable
    Committed,

    /// The write failed or was aborted
    Failed,
}

impl WriterState {
    /// No further writes or commits are accepted
    pub fn is_terminal(&self) -> bool {
        matches!(self, WriterState::Committed | WriterState::Failed)
    }
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterState::Empty => write!(f, "empty"),
            WriterState::Buffering => write!(f, "buffering"),
            WriterState::MultipartActive => write!(f, "multipart-active"),
            WriterState::Committed => write!(f, "committed"),
            WriterState::Failed => write!(f, "failed"),
        }
    }
}

/// An open multipart upload and the parts accepted so far
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Object key
    pub key: String,

    /// Upload ID returned by the backend
    pub upload_id: String,

    /// Completed parts information
    pub completed_parts: Vec<UploadPartInfo>,
}

impl UploadSession {
    pub fn new(key: String, upload_id: String) -> Self {
        Self {
            key,
            upload_id,
            completed_parts: Vec::new(),
        }
    }

    /// Get the total bytes uploaded
    pub fn bytes_uploaded(&self) -> u64 {
        self.completed_parts.iter().map(|p| p.size as u64).sum()
    }

    /// Get the next part number to upload
    pub fn next_part_number(&self) -> i32 {
        self.completed_parts
            .iter()
            .map(|p| p.part_number)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Parts sorted by part number, ready for completion
    pub fn ordered_parts(&self) -> Vec<UploadPartInfo> {
        let mut parts = self.completed_parts.clone();
        parts.sort_by_key(|p| p.part_number);
        parts
    }
}

/// Information about an uploaded part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPartInfo {
    /// Part number (1-indexed)
    pub part_number: i32,

    /// ETag of the uploaded part
    pub etag: String,

    /// Size of the part in bytes
    pub size: usize,
}

impl UploadPartInfo {
    /// Create a new upload part info
    pub fn new(part_number: i32, etag: String, size: usize) -> Self {
        Self {
            part_number,
            etag,
            size,
        }
    }
}
