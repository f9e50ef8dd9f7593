//! Binary payload storage contract and an in-memory content-addressed store

use ahash::RandomState;
use anyhow::anyhow;
use arbor_core::{hash_bytes, BinaryReference, Result};
use arbor_store::RecordStream;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

/// Chunk size used when streaming a payload back out
const READ_CHUNK: usize = 64 * 1024;

/// Store of uploaded binary payloads
#[async_trait]
pub trait BinaryManagerService: Send + Sync {
    /// Store a payload; `length`, when given, must match the bytes received
    async fn create_file(&self, content: RecordStream<Bytes>, length: Option<u64>) -> Result<BinaryReference>;

    /// Payload chunks, `None` for an unknown locator
    async fn input_stream_for(&self, reference: &BinaryReference) -> Result<Option<RecordStream<Bytes>>>;

    async fn file_exists(&self, reference: &BinaryReference) -> Result<bool>;

    /// Whole payload in one buffer
    async fn read(&self, reference: &BinaryReference) -> Result<Option<Bytes>> {
        let Some(chunks) = self.input_stream_for(reference).await? else {
            return Ok(None);
        };
        let buf = chunks
            .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await?;
        Ok(Some(buf.freeze()))
    }
}

/// Payloads in process memory, located by BLAKE3 digest
///
/// Identical uploads share one entry.
#[derive(Default)]
pub struct MemoryBinaryManager {
    blobs: DashMap<String, Bytes, RandomState>,
}

impl MemoryBinaryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BinaryManagerService for MemoryBinaryManager {
    async fn create_file(&self, content: RecordStream<Bytes>, length: Option<u64>) -> Result<BinaryReference> {
        let payload = content
            .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await?
            .freeze();

        if let Some(expected) = length {
            if payload.len() as u64 != expected {
                return Err(anyhow!(
                    "binary upload truncated: expected {} bytes, received {}",
                    expected,
                    payload.len()
                )
                .into());
            }
        }

        let locator = hash_bytes(&payload).to_hex();
        debug!(locator = %locator, size = payload.len(), "stored binary");
        self.blobs.entry(locator.clone()).or_insert(payload);
        Ok(BinaryReference::new(locator))
    }

    async fn input_stream_for(&self, reference: &BinaryReference) -> Result<Option<RecordStream<Bytes>>> {
        let Some(payload) = self.blobs.get(reference.locator()).map(|b| b.clone()) else {
            return Ok(None);
        };
        let chunks: Vec<Bytes> = (0..payload.len())
            .step_by(READ_CHUNK)
            .map(|start| payload.slice(start..(start + READ_CHUNK).min(payload.len())))
            .collect();
        Ok(Some(stream::iter(chunks.into_iter().map(Ok)).boxed()))
    }

    async fn file_exists(&self, reference: &BinaryReference) -> Result<bool> {
        Ok(self.blobs.contains_key(reference.locator()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_store::adapter::record_stream;

    fn upload(parts: &[&'static [u8]]) -> RecordStream<Bytes> {
        record_stream(parts.iter().map(|p| Bytes::from_static(*p)).collect())
    }

    #[tokio::test]
    async fn test_identical_uploads_share_a_locator() {
        let binaries = MemoryBinaryManager::new();
        let a = binaries.create_file(upload(&[b"hello ", b"world"]), Some(11)).await.unwrap();
        let b = binaries.create_file(upload(&[b"hello world"]), None).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(binaries.len(), 1);
        assert!(binaries.file_exists(&a).await.unwrap());
        assert_eq!(binaries.read(&a).await.unwrap().unwrap(), Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_length_mismatch_is_rejected() {
        let binaries = MemoryBinaryManager::new();
        assert!(binaries.create_file(upload(&[b"abc"]), Some(4)).await.is_err());
        assert!(binaries.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_locator() {
        let binaries = MemoryBinaryManager::new();
        let missing = BinaryReference::new("00");
        assert!(!binaries.file_exists(&missing).await.unwrap());
        assert!(binaries.read(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_large_payload_streams_in_chunks() {
        let binaries = MemoryBinaryManager::new();
        let payload = Bytes::from(vec![7u8; READ_CHUNK * 2 + 5]);
        let reference = binaries
            .create_file(record_stream(vec![payload.clone()]), Some(payload.len() as u64))
            .await
            .unwrap();
        let chunks: Vec<_> = binaries
            .input_stream_for(&reference)
            .await
            .unwrap()
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(binaries.read(&reference).await.unwrap().unwrap(), payload);
    }
}
