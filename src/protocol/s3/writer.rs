//! Streaming object writer
//!
//! [`MultipartObjectWriter`] accepts bytes in arbitrary chunks and turns them
//! into exactly one durable object. Bytes are buffered up to the part size;
//! a full part is only shipped once more data arrives, so an object that
//! fits in a single part is stored with one PUT and no multipart session is
//! ever opened for it.
//!
//! Lifecycle:
//!
//! ```text
//! Empty -> Buffering -> MultipartActive -> Committed
//!   \          \              \
//!    +----------+--------------+--> Failed
//! ```
//!
//! Any failure moves the writer to `Failed`, aborts an open session on a
//! best-effort basis, and makes every later call report the same failure.

use super::classify::{self, FailureKind, FailureSignal, ProbeOutcome};
use super::config::WriterOptions;
use super::error::{S3Error, WriterError, WriterResult};
use super::operations::UploadOperations;
use super::types::{
    CompleteUploadRequest, InitiateUploadRequest, PutObjectRequest, UploadPartInfo,
    UploadPartRequest, UploadSession, WriterState,
};
use bytes::BytesMut;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Writes one object to S3, switching to multipart once a part fills up
pub struct MultipartObjectWriter {
    client: Arc<dyn UploadOperations>,
    key: String,
    options: WriterOptions,
    buffer: BytesMut,
    session: Option<UploadSession>,
    state: WriterState,
    position: u64,
    failure: Option<WriterError>,
}

impl MultipartObjectWriter {
    /// Create a writer for `key`.
    ///
    /// Fails with [`WriterError::Configuration`] if the options are invalid
    /// or if create-only writes are requested against a backend that does
    /// not support them.
    pub fn new(
        client: Arc<dyn UploadOperations>,
        key: impl Into<String>,
        options: WriterOptions,
    ) -> WriterResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(WriterError::Configuration(
                "Object key cannot be empty".to_string(),
            ));
        }
        options.validate()?;

        if options.conditional.is_active() && !client.supports_conditional_writes() {
            return Err(WriterError::Configuration(format!(
                "Conditional writes are enabled but the backend for bucket {} does not support them",
                client.bucket()
            )));
        }

        debug!(
            "Opened writer for {}/{} (part size {}, encryption {}, conditional {})",
            client.bucket(),
            key,
            options.part_size,
            options.encryption.name(),
            options.conditional.is_active()
        );

        Ok(Self {
            client,
            key,
            buffer: BytesMut::with_capacity(options.part_size),
            options,
            session: None,
            state: WriterState::Empty,
            position: 0,
            failure: None,
        })
    }

    /// Object key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Total bytes accepted so far
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Upload ID of the open multipart session, if any
    pub fn upload_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.upload_id.as_str())
    }

    /// Parts uploaded in the open session
    pub fn completed_parts(&self) -> &[UploadPartInfo] {
        self.session
            .as_ref()
            .map(|s| s.completed_parts.as_slice())
            .unwrap_or(&[])
    }

    /// Append bytes to the object.
    ///
    /// May upload a buffered part (opening the multipart session first) when
    /// the buffer is full and more bytes arrive.
    pub async fn write(&mut self, mut data: &[u8]) -> WriterResult<()> {
        self.ensure_writable()?;

        while !data.is_empty() {
            if self.buffer.len() >= self.options.part_size {
                self.flush_part().await?;
            }

            let room = self.options.part_size - self.buffer.len();
            let take = room.min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            self.position += take as u64;
            data = &data[take..];

            if self.state == WriterState::Empty {
                self.state = WriterState::Buffering;
            }
        }

        Ok(())
    }

    /// Make the object durable.
    ///
    /// Without an open session the buffered bytes (possibly none) are stored
    /// with a single PUT. Otherwise the remaining bytes are uploaded as the
    /// final part and the session is completed. When create-only writes are
    /// active, a precondition rejection is resolved with an existence probe
    /// into [`WriterError::TargetExists`] or [`WriterError::ConsistencyFault`].
    pub async fn commit(&mut self) -> WriterResult<()> {
        match self.state {
            WriterState::Committed => return Err(self.closed()),
            WriterState::Failed => {
                return Err(self.failure.clone().unwrap_or_else(|| self.closed()));
            }
            _ => {}
        }

        if self.session.is_some() {
            self.complete_upload().await
        } else {
            self.put_whole_object().await
        }
    }

    /// Discard the write. A committed object is left untouched.
    pub async fn abort(&mut self) -> WriterResult<()> {
        if self.state == WriterState::Committed {
            debug!("Abort after commit of {} is a no-op", self.key);
            return Ok(());
        }

        self.buffer.clear();
        self.state = WriterState::Failed;

        let Some(session) = self.session.take() else {
            return Ok(());
        };

        info!(
            "Aborting multipart upload {} for {}",
            session.upload_id, session.key
        );
        self.client
            .abort_multipart_upload(&session.key, &session.upload_id)
            .await
            .map_err(|source| {
                warn!(
                    "Failed to abort multipart upload {} for {}: {}",
                    session.upload_id, session.key, source
                );
                WriterError::RecoverableIo {
                    key: session.key.clone(),
                    retriable: source.is_retryable(),
                    source,
                }
            })
    }

    fn ensure_writable(&self) -> WriterResult<()> {
        if self.state.is_terminal() {
            return Err(self.closed());
        }
        Ok(())
    }

    fn closed(&self) -> WriterError {
        WriterError::Closed {
            key: self.key.clone(),
            state: self.state,
        }
    }

    async fn initiate(&mut self) -> WriterResult<()> {
        let request = InitiateUploadRequest {
            key: self.key.clone(),
            encryption: self.options.encryption.params(),
            storage_class: self.options.storage_class,
            acl: self.options.acl.clone(),
            content_type: self.options.content_type.clone(),
        };

        match self.client.initiate_multipart_upload(request).await {
            Ok(upload_id) => {
                debug!(
                    "Initiated multipart upload {} for {}/{}",
                    upload_id,
                    self.client.bucket(),
                    self.key
                );
                self.session = Some(UploadSession::new(self.key.clone(), upload_id));
                self.state = WriterState::MultipartActive;
                Ok(())
            }
            Err(source) => {
                let err = self.recoverable(source.context("Failed to initiate multipart upload"));
                Err(self.fail(err).await)
            }
        }
    }

    /// Upload the buffered bytes as the next part
    async fn flush_part(&mut self) -> WriterResult<()> {
        if self.session.is_none() {
            self.initiate().await?;
        }
        let Some(session) = self.session.as_ref() else {
            return Err(self.closed());
        };

        let part_number = session.next_part_number();
        let body = self.buffer.split().freeze();
        let size = body.len();
        let request = UploadPartRequest {
            key: session.key.clone(),
            upload_id: session.upload_id.clone(),
            part_number,
            body,
            customer_key: self.options.encryption.customer_key().cloned(),
        };

        match self.client.upload_part(request).await {
            Ok(etag) => {
                debug!("Uploaded part {} of {} ({} bytes)", part_number, self.key, size);
                if let Some(session) = self.session.as_mut() {
                    session
                        .completed_parts
                        .push(UploadPartInfo::new(part_number, etag, size));
                }
                Ok(())
            }
            Err(source) => {
                let err = self.recoverable(
                    source.context(format!("Failed to upload part {}", part_number)),
                );
                Err(self.fail(err).await)
            }
        }
    }

    async fn put_whole_object(&mut self) -> WriterResult<()> {
        let body = self.buffer.split().freeze();
        let size = body.len();
        let request = PutObjectRequest {
            key: self.key.clone(),
            body,
            encryption: self.options.encryption.params(),
            storage_class: self.options.storage_class,
            acl: self.options.acl.clone(),
            content_type: self.options.content_type.clone(),
            if_none_match: self.options.conditional.if_none_match(),
        };

        match self.client.put_object(request).await {
            Ok(()) => {
                self.state = WriterState::Committed;
                info!(
                    "Stored {}/{} with a single PUT ({} bytes)",
                    self.client.bucket(),
                    self.key,
                    size
                );
                Ok(())
            }
            Err(source) => {
                let err = self.interpret_commit_failure(source).await;
                Err(self.fail(err).await)
            }
        }
    }

    async fn complete_upload(&mut self) -> WriterResult<()> {
        if !self.buffer.is_empty() {
            self.flush_part().await?;
        }
        let Some(session) = self.session.as_ref() else {
            return Err(self.closed());
        };

        let parts = session.ordered_parts();
        let part_count = parts.len();
        let request = CompleteUploadRequest {
            key: session.key.clone(),
            upload_id: session.upload_id.clone(),
            parts,
            if_none_match: self.options.conditional.if_none_match(),
        };

        match self.client.complete_multipart_upload(request).await {
            Ok(()) => {
                self.session = None;
                self.state = WriterState::Committed;
                info!(
                    "Completed multipart upload of {}/{} ({} parts, {} bytes)",
                    self.client.bucket(),
                    self.key,
                    part_count,
                    self.position
                );
                Ok(())
            }
            Err(source) => {
                let err = self.interpret_commit_failure(source).await;
                Err(self.fail(err).await)
            }
        }
    }

    /// Failures outside the commit call never need a probe
    fn recoverable(&self, source: S3Error) -> WriterError {
        let retriable = match classify::classify(&FailureSignal::from_error(&source), false, None) {
            FailureKind::Recoverable { retriable } => retriable,
            _ => true,
        };
        WriterError::RecoverableIo {
            key: self.key.clone(),
            retriable,
            source,
        }
    }

    async fn interpret_commit_failure(&self, source: S3Error) -> WriterError {
        let bucket = self.client.bucket().to_string();
        let conditional = self.options.conditional.is_active();
        let signal = FailureSignal::from_error(&source);

        let probe = if classify::requires_existence_probe(&signal, conditional) {
            let outcome = match self.client.object_exists(&bucket, &self.key).await {
                Ok(true) => ProbeOutcome::Exists,
                Ok(false) => ProbeOutcome::Absent,
                Err(e) => {
                    warn!("Existence probe for {}/{} failed: {}", bucket, self.key, e);
                    ProbeOutcome::Unavailable
                }
            };
            Some(outcome)
        } else {
            None
        };

        let status = signal.status;
        match classify::classify(&signal, conditional, probe) {
            FailureKind::TargetExists => {
                info!(
                    "Conditional write rejected: {}/{} already exists",
                    bucket, self.key
                );
                WriterError::TargetExists {
                    bucket,
                    key: self.key.clone(),
                }
            }
            FailureKind::ConsistencyFault => {
                error!(
                    "Backend rejected the write precondition for {}/{} but the object does not exist",
                    bucket, self.key
                );
                WriterError::ConsistencyFault {
                    message: format!(
                        "precondition rejected (HTTP {}) but {}/{} does not exist",
                        status.unwrap_or_default(),
                        bucket,
                        self.key
                    ),
                    bucket,
                    key: self.key.clone(),
                }
            }
            FailureKind::Recoverable { retriable } => WriterError::RecoverableIo {
                key: self.key.clone(),
                retriable,
                source,
            },
        }
    }

    /// Move to `Failed`, abort any open session and remember `err`
    async fn fail(&mut self, err: WriterError) -> WriterError {
        warn!("Write of {} failed: {}", self.key, err);

        if let Some(session) = self.session.take() {
            match self
                .client
                .abort_multipart_upload(&session.key, &session.upload_id)
                .await
            {
                Ok(()) => debug!(
                    "Aborted multipart upload {} for {}",
                    session.upload_id, session.key
                ),
                Err(e) => warn!(
                    "Failed to abort multipart upload {} for {}; uploaded parts may remain: {}",
                    session.upload_id, session.key, e
                ),
            }
        }

        self.buffer.clear();
        self.state = WriterState::Failed;
        self.failure = Some(err.clone());
        err
    }
}

impl fmt::Debug for MultipartObjectWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartObjectWriter")
            .field("bucket", &self.client.bucket())
            .field("key", &self.key)
            .field("state", &self.state)
            .field("position", &self.position)
            .field("buffered", &self.buffer.len())
            .field("upload_id", &self.upload_id())
            .finish_non_exhaustive()
    }
}

/// An open session is aborted in the background when a runtime is available
impl Drop for MultipartObjectWriter {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        warn!(
            "Writer for {} dropped with multipart upload {} still open ({} parts, {} bytes)",
            self.key,
            session.upload_id,
            session.completed_parts.len(),
            session.bytes_uploaded()
        );

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(
                "No async runtime to abort multipart upload {}; uploaded parts may remain",
                session.upload_id
            );
            return;
        };

        let client = Arc::clone(&self.client);
        handle.spawn(async move {
            match client
                .abort_multipart_upload(&session.key, &session.upload_id)
                .await
            {
                Ok(()) => debug!(
                    "Aborted multipart upload {} for dropped writer of {}",
                    session.upload_id, session.key
                ),
                Err(e) => warn!(
                    "Failed to abort multipart upload {} for {}: {}",
                    session.upload_id, session.key, e
                ),
            }
        });
    }
}
