//! Error types for S3 streaming uploads

use super::types::WriterState;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for S3 backend calls
pub type S3Result<T> = Result<T, S3Error>;

/// Result type for object writer operations
pub type WriterResult<T> = Result<T, WriterError>;

/// Which side of the conversation a rejected request is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// The request itself was rejected (4xx, precondition failures)
    Client,

    /// The service failed to handle an otherwise valid request (5xx, throttling)
    Service,
}

impl ErrorOrigin {
    /// Attribute a response to client or service from its status and error code
    pub fn from_response(status: u16, code: &str) -> Self {
        if status >= 500 || is_retryable_code(code) {
            ErrorOrigin::Service
        } else {
            ErrorOrigin::Client
        }
    }
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorOrigin::Client => write!(f, "client"),
            ErrorOrigin::Service => write!(f, "service"),
        }
    }
}

/// Errors raised by the S3 backend
#[derive(Error, Debug, Clone)]
pub enum S3Error {
    /// AWS SDK error without a more specific shape
    #[error("AWS SDK error: {0}")]
    Sdk(String),

    /// The backend answered with an error response
    #[error("S3 {origin} error (HTTP {status}, {code}): {message}")]
    Service {
        origin: ErrorOrigin,
        status: u16,
        code: String,
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid bucket name
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    /// Malformed multipart response (missing upload ID or ETag)
    #[error("Multipart upload error: {0}")]
    MultipartUpload(String),

    /// I/O error during transfer
    #[error("I/O error: {0}")]
    Io(String),

    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<S3Error>,
    },
}

impl S3Error {
    /// Build a client-attributed error response
    pub fn client(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        S3Error::Service {
            origin: ErrorOrigin::Client,
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a service-attributed error response
    pub fn service(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        S3Error::Service {
            origin: ErrorOrigin::Service,
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Add context to an error
    pub fn context(self, context: impl Into<String>) -> Self {
        S3Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// HTTP status of the failed call, if the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            S3Error::Service { status, .. } => Some(*status),
            S3Error::WithContext { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Backend error code, if one was returned
    pub fn code(&self) -> Option<&str> {
        match self {
            S3Error::Service { code, .. } => Some(code.as_str()),
            S3Error::WithContext { source, .. } => source.code(),
            _ => None,
        }
    }

    /// Client/service attribution; `None` for transport-level failures
    pub fn origin(&self) -> Option<ErrorOrigin> {
        match self {
            S3Error::Service { origin, .. } => Some(*origin),
            S3Error::WithContext { source, .. } => source.origin(),
            _ => None,
        }
    }

    /// Check if this error is retryable
    ///
    /// Service-side and transport failures are worth another attempt.
    /// Rejected requests and configuration problems are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            S3Error::Service { origin, .. } => *origin == ErrorOrigin::Service,
            S3Error::Sdk(_)
            | S3Error::MultipartUpload(_)
            | S3Error::Io(_)
            | S3Error::Network(_)
            | S3Error::Timeout(_) => true,
            S3Error::InvalidConfig(_) | S3Error::InvalidBucketName(_) => false,
            S3Error::WithContext { source, .. } => source.is_retryable(),
        }
    }
}

/// Error codes that indicate a transient, service-side condition
pub(crate) fn is_retryable_code(code: &str) -> bool {
    matches!(
        code,
        "RequestTimeout"
            | "ServiceUnavailable"
            | "InternalError"
            | "SlowDown"
            | "Throttling"
            | "ThrottlingException"
            | "RequestTimeTooSkewed"
    )
}

impl From<io::Error> for S3Error {
    fn from(err: io::Error) -> Self {
        S3Error::Io(err.to_string())
    }
}

impl<E> From<SdkError<E>> for S3Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    fn from(err: SdkError<E>) -> Self {
        match err {
            SdkError::ServiceError(context) => {
                let status = context.raw().status().as_u16();
                let service_err = context.err();
                let code = service_err.code().unwrap_or("Unknown").to_string();
                let message = service_err
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| service_err.to_string());
                S3Error::Service {
                    origin: ErrorOrigin::from_response(status, &code),
                    status,
                    code,
                    message,
                }
            }
            SdkError::TimeoutError(e) => S3Error::Timeout(format!("{:?}", e)),
            SdkError::DispatchFailure(e) => {
                S3Error::Network(format!("Network dispatch failure: {:?}", e))
            }
            SdkError::ResponseError(e) => S3Error::Network(format!("Response error: {:?}", e)),
            other => S3Error::Sdk(format!("{:?}", other)),
        }
    }
}

/// Errors surfaced by [`MultipartObjectWriter`](super::MultipartObjectWriter)
#[derive(Error, Debug, Clone)]
pub enum WriterError {
    /// The write failed and may or may not be worth retrying
    #[error("Upload of {key} failed (retriable: {retriable}): {source}")]
    RecoverableIo {
        key: String,
        retriable: bool,
        #[source]
        source: S3Error,
    },

    /// A conditional write was rejected because the object already exists
    #[error("Object already exists: {bucket}/{key}")]
    TargetExists { bucket: String, key: String },

    /// The backend rejected the write precondition but the object is absent
    #[error("Storage consistency fault for {bucket}/{key}: {message}")]
    ConsistencyFault {
        bucket: String,
        key: String,
        message: String,
    },

    /// Invalid writer configuration
    #[error("Invalid writer configuration: {0}")]
    Configuration(String),

    /// The writer has already been committed or aborted
    #[error("Writer for {key} is closed (state: {state})")]
    Closed { key: String, state: WriterState },
}

impl WriterError {
    /// Whether the caller may retry the write
    pub fn is_retryable(&self) -> bool {
        matches!(self, WriterError::RecoverableIo { retriable: true, .. })
    }

    /// Whether the failure means another writer already produced the object
    pub fn is_target_exists(&self) -> bool {
        matches!(self, WriterError::TargetExists { .. })
    }

    /// Whether the failure should stop the pipeline
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WriterError::ConsistencyFault { .. } | WriterError::Configuration(_)
        )
    }
}
