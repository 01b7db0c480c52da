//! S3 configuration types

use super::error::{S3Error, S3Result, WriterError, WriterResult};
use super::types::{
    ConditionalWritePolicy, CustomerKey, EncryptionSpec, S3StorageClass, SecretValue,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for S3 streaming uploads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,

    /// AWS region (e.g., "us-east-1")
    pub region: Option<String>,

    /// Custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint: Option<String>,

    /// AWS access key ID (optional, can use default credential chain)
    pub access_key: Option<String>,

    /// AWS secret access key
    #[serde(skip_serializing)]
    pub secret_key: Option<SecretValue>,

    /// AWS session token (for temporary credentials)
    #[serde(skip_serializing)]
    pub session_token: Option<SecretValue>,

    /// Force path-style addressing (required for MinIO, LocalStack)
    pub force_path_style: bool,

    /// Storage class for uploaded objects
    pub storage_class: S3StorageClass,

    /// Part size threshold in bytes; a full part is uploaded once more data arrives
    pub part_size: usize,

    /// Operation timeout in seconds
    pub timeout_seconds: u64,

    /// Attempts the SDK makes after the first, per call
    pub max_retries: u32,

    /// Server-side encryption algorithm: `AES256`, `aws:kms` or `KMS`
    pub sse_algorithm: Option<String>,

    /// KMS key id, required when the algorithm is KMS
    pub sse_kms_key_id: Option<String>,

    /// Base64-encoded JSON KMS encryption context
    pub sse_kms_encryption_context: Option<String>,

    /// Base64-encoded 256-bit customer key (SSE-C)
    #[serde(skip_serializing)]
    pub sse_customer_key: Option<SecretValue>,

    /// Canned ACL for created objects (e.g., "bucket-owner-full-control")
    pub acl: Option<String>,

    /// Content-Type header for created objects
    pub content_type: Option<String>,

    /// Attach `If-None-Match: *` to commits (needs a rotation interval)
    pub enable_conditional_writes: bool,

    /// Scheduled rotation interval of the producing pipeline, in milliseconds
    pub rotate_schedule_interval_ms: Option<u64>,

    /// Whether the backend honors `If-None-Match` on writes
    pub conditional_writes_supported: bool,
}

impl S3Config {
    /// Create a new S3 config with required parameters
    pub fn new(bucket: String) -> Self {
        Self {
            bucket,
            region: None,
            endpoint: None,
            access_key: None,
            secret_key: None,
            session_token: None,
            force_path_style: false,
            storage_class: S3StorageClass::Standard,
            part_size: super::DEFAULT_PART_SIZE,
            timeout_seconds: 300, // 5 minutes
            max_retries: 3,
            sse_algorithm: None,
            sse_kms_key_id: None,
            sse_kms_encryption_context: None,
            sse_customer_key: None,
            acl: None,
            content_type: None,
            enable_conditional_writes: false,
            rotate_schedule_interval_ms: None,
            conditional_writes_supported: true,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> S3Result<()> {
        // Validate bucket name
        if self.bucket.is_empty() {
            return Err(S3Error::InvalidBucketName(
                "Bucket name cannot be empty".to_string(),
            ));
        }

        if !is_valid_bucket_name(&self.bucket) {
            return Err(S3Error::InvalidBucketName(format!(
                "Invalid bucket name: {}. Bucket names must be 3-63 characters, \
                 lowercase letters, numbers, hyphens, and periods only",
                self.bucket
            )));
        }

        check_part_size(self.part_size).map_err(S3Error::InvalidConfig)?;

        // Validate credentials consistency
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(S3Error::InvalidConfig(
                "Both access_key and secret_key must be provided together".to_string(),
            ));
        }

        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint).map_err(|e| {
                S3Error::InvalidConfig(format!("Invalid endpoint URL {}: {}", endpoint, e))
            })?;
        }

        Ok(())
    }

    /// Resolve the encryption settings
    pub fn encryption(&self) -> Result<EncryptionSpec, String> {
        EncryptionSpec::resolve(
            self.sse_algorithm.as_deref(),
            self.sse_kms_key_id.as_deref(),
            self.sse_kms_encryption_context.as_deref(),
            self.sse_customer_key.as_ref().map(SecretValue::expose),
        )
    }

    /// Customer key to present when reading objects back (HEAD), if SSE-C is configured
    pub fn customer_key(&self) -> S3Result<Option<CustomerKey>> {
        let spec = self.encryption().map_err(S3Error::InvalidConfig)?;
        Ok(spec.customer_key().cloned())
    }

    /// The create-only write policy
    pub fn conditional_write_policy(&self) -> ConditionalWritePolicy {
        ConditionalWritePolicy::new(
            self.enable_conditional_writes,
            self.rotate_schedule_interval_ms,
        )
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self::new("".to_string())
    }
}

/// Builder for S3Config
pub struct S3ConfigBuilder {
    config: S3Config,
}

impl S3ConfigBuilder {
    /// Create a new builder with bucket name
    pub fn new(bucket: String) -> Self {
        Self {
            config: S3Config::new(bucket),
        }
    }

    /// Set the AWS region
    pub fn region(mut self, region: String) -> Self {
        self.config.region = Some(region);
        self
    }

    /// Set a custom endpoint
    pub fn endpoint(mut self, endpoint: String) -> Self {
        self.config.endpoint = Some(endpoint);
        self
    }

    /// Set explicit credentials
    pub fn credentials(mut self, access_key: String, secret_key: String) -> Self {
        self.config.access_key = Some(access_key);
        self.config.secret_key = Some(SecretValue::new(secret_key));
        self
    }

    /// Set session token
    pub fn session_token(mut self, token: String) -> Self {
        self.config.session_token = Some(SecretValue::new(token));
        self
    }

    /// Enable path-style addressing
    pub fn force_path_style(mut self, force: bool) -> Self {
        self.config.force_path_style = force;
        self
    }

    /// Set storage class
    pub fn storage_class(mut self, storage_class: S3StorageClass) -> Self {
        self.config.storage_class = storage_class;
        self
    }

    /// Set the part size threshold
    pub fn part_size(mut self, size: usize) -> Self {
        self.config.part_size = size;
        self
    }

    /// Set operation timeout
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    /// Set maximum retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the server-side encryption algorithm
    pub fn sse_algorithm(mut self, algorithm: String) -> Self {
        self.config.sse_algorithm = Some(algorithm);
        self
    }

    /// Set the KMS key id
    pub fn sse_kms_key_id(mut self, key_id: String) -> Self {
        self.config.sse_kms_key_id = Some(key_id);
        self
    }

    /// Set the KMS encryption context
    pub fn sse_kms_encryption_context(mut self, context: String) -> Self {
        self.config.sse_kms_encryption_context = Some(context);
        self
    }

    /// Set a customer-provided key (base64)
    pub fn sse_customer_key(mut self, key: String) -> Self {
        self.config.sse_customer_key = Some(SecretValue::new(key));
        self
    }

    /// Set canned ACL
    pub fn acl(mut self, acl: String) -> Self {
        self.config.acl = Some(acl);
        self
    }

    /// Set content type
    pub fn content_type(mut self, content_type: String) -> Self {
        self.config.content_type = Some(content_type);
        self
    }

    /// Enable create-only writes with the pipeline's rotation interval
    pub fn conditional_writes(
        mut self,
        enabled: bool,
        rotate_schedule_interval_ms: Option<u64>,
    ) -> Self {
        self.config.enable_conditional_writes = enabled;
        self.config.rotate_schedule_interval_ms = rotate_schedule_interval_ms;
        self
    }

    /// Declare whether the backend honors `If-None-Match`
    pub fn conditional_writes_supported(mut self, supported: bool) -> Self {
        self.config.conditional_writes_supported = supported;
        self
    }

    /// Build the configuration
    pub fn build(self) -> S3Result<S3Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Per-object writer settings
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Buffered bytes that make up one part
    pub part_size: usize,
    pub encryption: EncryptionSpec,
    pub conditional: ConditionalWritePolicy,
    pub storage_class: S3StorageClass,
    pub acl: Option<String>,
    pub content_type: Option<String>,
}

impl WriterOptions {
    /// Resolve writer options from configuration
    pub fn from_config(config: &S3Config) -> WriterResult<Self> {
        check_part_size(config.part_size).map_err(WriterError::Configuration)?;
        let encryption = config.encryption().map_err(WriterError::Configuration)?;

        let conditional = config.conditional_write_policy();
        if conditional.enabled && !conditional.is_active() {
            warn!(
                "Conditional writes are enabled but no rotation schedule interval is set; \
                 commits will not carry If-None-Match"
            );
        }

        let options = Self {
            part_size: config.part_size,
            encryption,
            conditional,
            storage_class: config.storage_class,
            acl: config.acl.clone(),
            content_type: config.content_type.clone(),
        };
        options.validate()?;
        Ok(options)
    }

    /// Basic sanity checks; the S3 part-size minimum is enforced by [`S3Config`]
    pub fn validate(&self) -> WriterResult<()> {
        if self.part_size == 0 {
            return Err(WriterError::Configuration(
                "Part size must be at least 1 byte".to_string(),
            ));
        }
        if self.part_size > super::MAX_PART_SIZE {
            return Err(WriterError::Configuration(format!(
                "Part size {} exceeds maximum {}",
                self.part_size,
                super::MAX_PART_SIZE
            )));
        }
        Ok(())
    }
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            part_size: super::DEFAULT_PART_SIZE,
            encryption: EncryptionSpec::None,
            conditional: ConditionalWritePolicy::default(),
            storage_class: S3StorageClass::Standard,
            acl: None,
            content_type: None,
        }
    }
}

fn check_part_size(part_size: usize) -> Result<(), String> {
    if part_size < super::MIN_PART_SIZE {
        return Err(format!(
            "Part size {} is below minimum {}",
            part_size,
            super::MIN_PART_SIZE
        ));
    }

    if part_size > super::MAX_PART_SIZE {
        return Err(format!(
            "Part size {} exceeds maximum {}",
            part_size,
            super::MAX_PART_SIZE
        ));
    }

    Ok(())
}

/// Validate S3 bucket name according to AWS rules
fn is_valid_bucket_name(name: &str) -> bool {
    let bytes = name.as_bytes();

    // Length check: 3-63 characters
    if !(3..=63).contains(&bytes.len()) {
        return false;
    }

    // Must start and end with lowercase letter or number
    let alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !bytes.first().is_some_and(alnum) || !bytes.last().is_some_and(alnum) {
        return false;
    }

    // Only lowercase letters, numbers, hyphens, and periods
    if !bytes.iter().all(|b| alnum(b) || *b == b'-' || *b == b'.') {
        return false;
    }

    // Cannot have consecutive periods
    if name.contains("..") {
        return false;
    }

    // Cannot be formatted as IP address
    if name.split('.').count() == 4 && name.split('.').all(|s| s.parse::<u8>().is_ok()) {
        return false;
    }

    // Reserved prefix and suffix
    !name.starts_with("xn--") && !name.ends_with("-s3alias")
}
