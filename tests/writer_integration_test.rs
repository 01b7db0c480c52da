/*!
 * Integration tests for the streaming object writer
 *
 * Drives `MultipartObjectWriter` through the public API against a small
 * in-memory backend.
 */

use async_trait::async_trait;
use orbit_s3_stream::protocol::s3::{
    CompleteUploadRequest, ConditionalWritePolicy, InitiateUploadRequest, MultipartObjectWriter,
    PutObjectRequest, S3Error, S3Result, UploadOperations, UploadPartRequest, WriterError,
    WriterOptions, WriterState,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Stores objects in memory and honors `If-None-Match: *`
#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    parts: Mutex<HashMap<String, Vec<(i32, Vec<u8>)>>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryStore {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn check_precondition(&self, key: &str, if_none_match: Option<&str>) -> S3Result<()> {
        if if_none_match == Some("*") && self.objects.lock().unwrap().contains_key(key) {
            return Err(S3Error::client(412, "PreconditionFailed", "object exists"));
        }
        Ok(())
    }
}

#[async_trait]
impl UploadOperations for MemoryStore {
    fn bucket(&self) -> &str {
        "memory"
    }

    async fn initiate_multipart_upload(&self, request: InitiateUploadRequest) -> S3Result<String> {
        self.record("initiate");
        let upload_id = format!("{}-upload", request.key);
        self.parts.lock().unwrap().insert(upload_id.clone(), Vec::new());
        Ok(upload_id)
    }

    async fn upload_part(&self, request: UploadPartRequest) -> S3Result<String> {
        self.record("upload_part");
        let mut parts = self.parts.lock().unwrap();
        let session = parts
            .get_mut(&request.upload_id)
            .ok_or_else(|| S3Error::client(404, "NoSuchUpload", "unknown upload"))?;
        session.push((request.part_number, request.body.to_vec()));
        Ok(format!("etag-{}", request.part_number))
    }

    async fn complete_multipart_upload(&self, request: CompleteUploadRequest) -> S3Result<()> {
        self.record("complete");
        self.check_precondition(&request.key, request.if_none_match.as_deref())?;

        let mut session = self
            .parts
            .lock()
            .unwrap()
            .remove(&request.upload_id)
            .ok_or_else(|| S3Error::client(404, "NoSuchUpload", "unknown upload"))?;
        session.sort_by_key(|(n, _)| *n);
        let data = session.into_iter().flat_map(|(_, d)| d).collect();
        self.objects.lock().unwrap().insert(request.key, data);
        Ok(())
    }

    async fn abort_multipart_upload(&self, _key: &str, upload_id: &str) -> S3Result<()> {
        self.record("abort");
        self.parts.lock().unwrap().remove(upload_id);
        Ok(())
    }

    async fn put_object(&self, request: PutObjectRequest) -> S3Result<()> {
        self.record("put");
        self.check_precondition(&request.key, request.if_none_match.as_deref())?;
        self.objects
            .lock()
            .unwrap()
            .insert(request.key, request.body.to_vec());
        Ok(())
    }

    async fn object_exists(&self, _bucket: &str, key: &str) -> S3Result<bool> {
        self.record("exists");
        Ok(self.objects.lock().unwrap().contains_key(key))
    }
}

fn options(part_size: usize, conditional: bool) -> WriterOptions {
    WriterOptions {
        part_size,
        conditional: ConditionalWritePolicy::new(conditional, Some(600_000)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_stream_many_small_chunks() {
    let store = Arc::new(MemoryStore::default());
    let mut writer =
        MultipartObjectWriter::new(store.clone(), "events.jsonl", options(16, false)).unwrap();

    let mut expected = Vec::new();
    for i in 0..25 {
        let line = format!("{{\"i\":{}}}\n", i);
        expected.extend_from_slice(line.as_bytes());
        writer.write(line.as_bytes()).await.unwrap();
    }
    writer.commit().await.unwrap();

    assert_eq!(writer.state(), WriterState::Committed);
    assert_eq!(writer.position(), expected.len() as u64);
    assert_eq!(store.object("events.jsonl").unwrap(), expected);
    assert_eq!(store.calls().iter().filter(|c| *c == "initiate").count(), 1);
    assert_eq!(store.calls().last().map(String::as_str), Some("complete"));
}

#[tokio::test]
async fn test_single_put_below_threshold() {
    let store = Arc::new(MemoryStore::default());
    let mut writer =
        MultipartObjectWriter::new(store.clone(), "small.json", options(1024, false)).unwrap();

    writer.write(b"{}").await.unwrap();
    writer.commit().await.unwrap();

    assert_eq!(store.calls(), vec!["put".to_string()]);
}

#[tokio::test]
async fn test_duplicate_commit_is_detected() {
    let store = Arc::new(MemoryStore::default());

    let mut first =

        MultipartObjectWriter::new(store.clone(), "dup.json", options(4, true)).unwrap();
    first.write(b"first attempt").await.unwrap();
    first.commit().await.unwrap();

    let mut retry =

        MultipartObjectWriter::new(store.clone(), "dup.json", options(4, true)).unwrap();
    retry.write(b"second attempt").await.unwrap();
    let err = retry.commit().await.unwrap_err();

    assert!(matches!(err, WriterError::TargetExists { .. }));
    assert_eq!(store.object("dup.json").unwrap(), b"first attempt".to_vec());
    assert!(store.calls().contains(&"exists".to_string()));
    assert!(store.calls().contains(&"abort".to_string()));
}

#[tokio::test]
async fn test_abort_discards_parts() {
    let store = Arc::new(MemoryStore::default());
    let mut writer =
        MultipartObjectWriter::new(store.clone(), "aborted.bin", options(4, false)).unwrap();

    writer.write(&[9u8; 10]).await.unwrap();
    assert!(writer.upload_id().is_some());
    writer.abort().await.unwrap();

    assert_eq!(writer.state(), WriterState::Failed);
    assert!(store.object("aborted.bin").is_none());
    assert!(writer.commit().await.is_err());
}
