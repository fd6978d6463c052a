//! Blob storage for archived attachments.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{BlobError, BlobResult};

/// An object store of named buckets.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> BlobResult<bool>;

    async fn create_bucket(&self, bucket: &str) -> BlobResult<()>;

    /// Writes `data` at `key`, replacing any existing object.
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> BlobResult<()>;

    /// Reads the object at `key`. `None` if there is none.
    async fn get(&self, bucket: &str, key: &str) -> BlobResult<Option<Bytes>>;
}

// ============================================================================
// MemoryBlobStore
// ============================================================================

/// An in-process blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    buckets: RwLock<HashMap<String, HashMap<String, Bytes>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of objects in `bucket`.
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets.read().get(bucket).map_or(0, HashMap::len)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn bucket_exists(&self, bucket: &str) -> BlobResult<bool> {
        Ok(self.buckets.read().contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> BlobResult<()> {
        self.buckets.write().entry(bucket.to_string()).or_default();
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> BlobResult<()> {
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| BlobError::NoSuchBucket(bucket.to_string()))?;
        objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> BlobResult<Option<Bytes>> {
        let buckets = self.buckets.read();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| BlobError::NoSuchBucket(bucket.to_string()))?;
        Ok(objects.get(key).cloned())
    }
}

// ============================================================================
// FsBlobStore
// ============================================================================

/// A blob store on the local filesystem.
///
/// Buckets are directories under the root; an object key `a/b` is the file
/// `<root>/<bucket>/a/b`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, bucket: &str) -> BlobResult<PathBuf> {
        if !is_valid_segment(bucket) {
            return Err(BlobError::InvalidKey(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> BlobResult<PathBuf> {
        let mut path = self.bucket_path(bucket)?;
        if key.is_empty() {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        for segment in key.split('/') {
            if !is_valid_segment(segment) {
                return Err(BlobError::InvalidKey(key.to_string()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    async fn require_bucket(&self, bucket: &str) -> BlobResult<PathBuf> {
        let path = self.bucket_path(bucket)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(BlobError::NoSuchBucket(bucket.to_string()));
        }
        Ok(path)
    }
}

fn is_valid_segment(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['\\', '\0'])
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn bucket_exists(&self, bucket: &str) -> BlobResult<bool> {
        let path = self.bucket_path(bucket)?;
        Ok(tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()))
    }

    async fn create_bucket(&self, bucket: &str) -> BlobResult<()> {
        let path = self.bucket_path(bucket)?;
        tokio::fs::create_dir_all(&path).await?;
        info!(path = %path.display(), "Created blob bucket");
        Ok(())
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> BlobResult<()> {
        self.require_bucket(bucket).await?;
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        debug!(bucket, key, bytes = data.len(), "Stored blob");
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> BlobResult<Option<Bytes>> {
        self.require_bucket(bucket).await?;
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
