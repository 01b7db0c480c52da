//! In-memory upload backend for tests
//!
//! Records every request it receives, assembles completed uploads into
//! stored objects, and can be scripted to fail individual calls.

use super::classify::{PRECONDITION_FAILED_CODE, PRECONDITION_FAILED_STATUS};
use super::error::{S3Error, S3Result};
use super::operations::UploadOperations;
use super::types::{
    CompleteUploadRequest, InitiateUploadRequest, PutObjectRequest, UploadPartRequest,
    IF_NONE_MATCH_ANY,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct MockState {
    objects: HashMap<String, Vec<u8>>,
    uploads: HashMap<String, BTreeMap<i32, Bytes>>,
    next_upload: u64,

    initiates: Vec<InitiateUploadRequest>,
    parts: Vec<UploadPartRequest>,
    completes: Vec<CompleteUploadRequest>,
    puts: Vec<PutObjectRequest>,
    aborted: Vec<String>,
    exists_calls: usize,

    fail_initiate: Option<S3Error>,
    fail_parts: HashMap<i32, S3Error>,
    fail_complete: Option<S3Error>,
    fail_put: Option<S3Error>,
    fail_abort: Option<S3Error>,
    exists_answer: Option<S3Result<bool>>,
}

/// Mock S3 backend
#[derive(Debug, Clone)]
pub struct MockUploadClient {
    bucket: String,
    conditional_writes: bool,
    state: Arc<RwLock<MockState>>,
}

impl MockUploadClient {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            conditional_writes: true,
            state: Arc::new(RwLock::new(MockState::default())),
        }
    }

    /// Report no support for `If-None-Match`
    pub fn without_conditional_writes(mut self) -> Self {
        self.conditional_writes = false;
        self
    }

    pub fn fail_initiate(&self, err: S3Error) {
        self.state.write().unwrap().fail_initiate = Some(err);
    }

    pub fn fail_upload_part(&self, part_number: i32, err: S3Error) {
        self.state.write().unwrap().fail_parts.insert(part_number, err);
    }

    pub fn fail_complete(&self, err: S3Error) {
        self.state.write().unwrap().fail_complete = Some(err);
    }

    pub fn fail_put(&self, err: S3Error) {
        self.state.write().unwrap().fail_put = Some(err);
    }

    /// Fail every abort; the call is still recorded
    pub fn fail_abort(&self, err: S3Error) {
        self.state.write().unwrap().fail_abort = Some(err);
    }

    /// Override the answer to existence probes
    pub fn set_exists_answer(&self, answer: S3Result<bool>) {
        self.state.write().unwrap().exists_answer = Some(answer);
    }

    /// Store an object directly
    pub fn insert_object(&self, key: &str, data: &[u8]) {
        self.state
            .write()
            .unwrap()
            .objects
            .insert(key.to_string(), data.to_vec());
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.state.read().unwrap().objects.get(key).cloned()
    }

    pub fn initiate_calls(&self) -> usize {
        self.state.read().unwrap().initiates.len()
    }

    pub fn initiates(&self) -> Vec<InitiateUploadRequest> {
        self.state.read().unwrap().initiates.clone()
    }

    pub fn uploaded_parts(&self) -> Vec<UploadPartRequest> {
        self.state.read().unwrap().parts.clone()
    }

    pub fn completes(&self) -> Vec<CompleteUploadRequest> {
        self.state.read().unwrap().completes.clone()
    }

    pub fn puts(&self) -> Vec<PutObjectRequest> {
        self.state.read().unwrap().puts.clone()
    }

    /// Upload IDs that were aborted
    pub fn aborted(&self) -> Vec<String> {
        self.state.read().unwrap().aborted.clone()
    }

    pub fn exists_calls(&self) -> usize {
        self.state.read().unwrap().exists_calls
    }
}

fn precondition_failed(key: &str) -> S3Error {
    S3Error::client(
        PRECONDITION_FAILED_STATUS,
        PRECONDITION_FAILED_CODE,
        format!("At least one of the pre-conditions you specified did not hold: {}", key),
    )
}

#[async_trait]
impl UploadOperations for MockUploadClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn supports_conditional_writes(&self) -> bool {
        self.conditional_writes
    }

    async fn initiate_multipart_upload(
        &self,
        request: InitiateUploadRequest,
    ) -> S3Result<String> {
        let mut state = self.state.write().unwrap();
        state.initiates.push(request);
        if let Some(err) = state.fail_initiate.clone() {
            return Err(err);
        }

        state.next_upload += 1;
        let upload_id = format!("upload-{}", state.next_upload);
        state.uploads.insert(upload_id.clone(), BTreeMap::new());
        Ok(upload_id)
    }

    async fn upload_part(&self, request: UploadPartRequest) -> S3Result<String> {
        let mut state = self.state.write().unwrap();
        state.parts.push(request.clone());
        if let Some(err) = state.fail_parts.get(&request.part_number).cloned() {
            return Err(err);
        }

        let parts = state
            .uploads
            .get_mut(&request.upload_id)
            .ok_or_else(|| S3Error::client(404, "NoSuchUpload", request.upload_id.clone()))?;
        parts.insert(request.part_number, request.body);
        Ok(format!("\"etag-{}\"", request.part_number))
    }

    async fn complete_multipart_upload(&self, request: CompleteUploadRequest) -> S3Result<()> {
        let mut state = self.state.write().unwrap();
        state.completes.push(request.clone());
        if let Some(err) = state.fail_complete.clone() {
            return Err(err);
        }
        if request.if_none_match.as_deref() == Some(IF_NONE_MATCH_ANY)
            && state.objects.contains_key(&request.key)
        {
            return Err(precondition_failed(&request.key));
        }

        let parts = state
            .uploads
            .remove(&request.upload_id)
            .ok_or_else(|| S3Error::client(404, "NoSuchUpload", request.upload_id.clone()))?;
        let mut data = Vec::new();
        for part in &request.parts {
            let body = parts
                .get(&part.part_number)
                .ok_or_else(|| S3Error::client(400, "InvalidPart", part.etag.clone()))?;
            data.extend_from_slice(body);
        }
        state.objects.insert(request.key, data);
        Ok(())
    }

    async fn abort_multipart_upload(&self, _key: &str, upload_id: &str) -> S3Result<()> {
        let mut state = self.state.write().unwrap();
        state.aborted.push(upload_id.to_string());
        if let Some(err) = state.fail_abort.clone() {
            return Err(err);
        }
        state.uploads.remove(upload_id);
        Ok(())
    }

    async fn put_object(&self, request: PutObjectRequest) -> S3Result<()> {
        let mut state = self.state.write().unwrap();
        state.puts.push(request.clone());
        if let Some(err) = state.fail_put.clone() {
            return Err(err);
        }
        if request.if_none_match.as_deref() == Some(IF_NONE_MATCH_ANY)
            && state.objects.contains_key(&request.key)
        {
            return Err(precondition_failed(&request.key));
        }

        state.objects.insert(request.key, request.body.to_vec());
        Ok(())
    }

    async fn object_exists(&self, _bucket: &str, key: &str) -> S3Result<bool> {
        let mut state = self.state.write().unwrap();
        state.exists_calls += 1;
        match state.exists_answer.clone() {
            Some(answer) => answer,
            None => Ok(state.objects.contains_key(key)),
        }
    }
}
