//! S3 client implementation

use super::config::S3Config;
use super::error::{S3Error, S3Result};
use super::types::{CustomerKey, PutObjectRequest};
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client as AwsS3Client;
use std::time::Duration;

/// S3 client for AWS S3 and S3-compatible storage
#[derive(Clone)]
pub struct S3Client {
    /// AWS S3 client
    client: AwsS3Client,

    /// Client configuration
    config: S3Config,

    /// SSE-C key sent on reads of objects this client wrote
    customer_key: Option<CustomerKey>,
}

impl S3Client {
    /// Create a new S3 client with the given configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use orbit_s3_stream::protocol::s3::{S3Client, S3Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = S3Config::new("my-bucket".to_string());
    ///     let client = S3Client::new(config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: S3Config) -> S3Result<Self> {
        config.validate()?;
        let customer_key = config.customer_key()?;

        let client = Self::build_aws_client(&config).await?;

        Ok(Self {
            client,
            config,
            customer_key,
        })
    }

    /// Build the AWS SDK S3 client from configuration
    async fn build_aws_client(config: &S3Config) -> S3Result<AwsS3Client> {
        let mut aws_config_loader = aws_config::defaults(BehaviorVersion::latest());

        let region_provider = if let Some(region_str) = &config.region {
            RegionProviderChain::first_try(Region::new(region_str.clone()))
        } else {
            RegionProviderChain::default_provider()
        };
        aws_config_loader = aws_config_loader.region(region_provider);

        // Explicit credentials override the default chain
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            let credentials = Credentials::new(
                access_key,
                secret_key.expose(),
                config.session_token.as_ref().map(|t| t.expose().to_string()),
                None,
                "orbit-s3-stream-explicit",
            );
            aws_config_loader = aws_config_loader.credentials_provider(credentials);
        }

        let aws_config = aws_config_loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        // Required for MinIO, LocalStack
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let timeout_config = aws_sdk_s3::config::timeout::TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.timeout_seconds))
            .build();
        s3_config_builder = s3_config_builder
            .timeout_config(timeout_config)
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_retries + 1));

        Ok(AwsS3Client::from_conf(s3_config_builder.build()))
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Get a reference to the underlying AWS S3 client
    pub fn aws_client(&self) -> &AwsS3Client {
        &self.client
    }

    /// Store a whole object with a single PUT
    pub async fn put_object(&self, request: PutObjectRequest) -> S3Result<()> {
        let encryption = &request.encryption;
        let kms = encryption.kms.as_ref();
        let customer_key = encryption.customer_key.as_ref();

        self.client
            .put_object()
            .bucket(self.bucket())
            .key(&request.key)
            .body(ByteStream::from(request.body))
            .storage_class(request.storage_class.to_aws())
            .set_acl(request.acl.as_deref().map(ObjectCannedAcl::from))
            .set_content_type(request.content_type.clone())
            .set_server_side_encryption(encryption.server_side_encryption())
            .set_ssekms_key_id(kms.map(|k| k.key_id.clone()))
            .set_ssekms_encryption_context(kms.and_then(|k| k.context.clone()))
            .set_sse_customer_algorithm(customer_key.map(|k| k.algorithm().to_string()))
            .set_sse_customer_key(customer_key.map(|k| k.key().to_string()))
            .set_sse_customer_key_md5(customer_key.map(|k| k.key_md5().to_string()))
            .set_if_none_match(request.if_none_match)
            .send()
            .await
            .map_err(S3Error::from)?;

        Ok(())
    }

    /// Check if an object exists in `bucket`
    ///
    /// Objects encrypted with a customer key answer HEAD with 400 unless the
    /// same key is presented, so the configured key is attached.
    pub async fn exists(&self, bucket: &str, key: &str) -> S3Result<bool> {
        let customer_key = self.customer_key.as_ref();
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .set_sse_customer_algorithm(customer_key.map(|k| k.algorithm().to_string()))
            .set_sse_customer_key(customer_key.map(|k| k.key().to_string()))
            .set_sse_customer_key_md5(customer_key.map(|k| k.key_md5().to_string()))
            .send()
            .await;

        match response {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(ref e)) if e.raw().status().as_u16() == 404 => Ok(false),
            Err(e) => Err(S3Error::from(e)),
        }
    }
}
