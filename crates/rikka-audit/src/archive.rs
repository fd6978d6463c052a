//! Best-effort attachment archival.
//!
//! Attachment URLs stop resolving once the message is deleted, so every
//! attachment is copied into blob storage when the message is first seen.
//! Objects are keyed `"{message_id}/{attachment_id}"` inside one bucket.
//! A failed download or upload leaves that one object absent and never stops
//! the others.

use std::sync::Arc;

use rikka_core::{Attachment, FileUpload, MessageId, Snowflake};
use tracing::{debug, info, warn};

use crate::blob::BlobStore;
use crate::error::AuditResult;
use crate::fetch::AttachmentFetcher;
use crate::snapshot::MessageSnapshot;

/// Default bucket for archived attachments.
pub const DEFAULT_BUCKET: &str = "message-attachments";

/// Outcome of [`AttachmentArchive::archive_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub archived: usize,
    pub failed: usize,
}

/// Copies attachments into a blob bucket and reads them back.
#[derive(Clone)]
pub struct AttachmentArchive {
    blobs: Arc<dyn BlobStore>,
    fetcher: Arc<dyn AttachmentFetcher>,
    bucket: String,
}

impl AttachmentArchive {
    pub fn new(blobs: Arc<dyn BlobStore>, fetcher: Arc<dyn AttachmentFetcher>) -> Self {
        Self {
            blobs,
            fetcher,
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the object key of an attachment.
    pub fn object_key(message_id: MessageId, attachment_id: Snowflake) -> String {
        format!("{message_id}/{attachment_id}")
    }

    /// Creates the bucket if it does not exist yet.
    pub async fn ensure_bucket(&self) -> AuditResult<()> {
        if self.blobs.bucket_exists(&self.bucket).await? {
            debug!(bucket = %self.bucket, "Attachment bucket exists");
            return Ok(());
        }
        self.blobs.create_bucket(&self.bucket).await?;
        info!(bucket = %self.bucket, "Created attachment bucket");
        Ok(())
    }

    /// Downloads one attachment and stores it.
    pub async fn archive(&self, message_id: MessageId, attachment: &Attachment) -> AuditResult<()> {
        let data = self.fetcher.fetch(attachment.download_url()).await?;
        let key = Self::object_key(message_id, attachment.id);
        self.blobs.put(&self.bucket, &key, data).await?;
        Ok(())
    }

    /// Archives every attachment of a message, skipping failures.
    pub async fn archive_all(&self, message: &MessageSnapshot) -> ArchiveReport {
        self.archive_new(message, &[]).await
    }

    /// Archives the attachments of a message whose ids are not in `known`.
    ///
    /// Edits can only drop attachments, so an edit of an archived message
    /// usually downloads nothing.
    pub async fn archive_new(&self, message: &MessageSnapshot, known: &[Snowflake]) -> ArchiveReport {
        let mut report = ArchiveReport::default();
        for attachment in message.attachments.iter().filter(|a| !known.contains(&a.id)) {
            match self.archive(message.id, attachment).await {
                Ok(()) => report.archived += 1,
                Err(e) => {
                    warn!(
                        message_id = %message.id,
                        attachment_id = %attachment.id,
                        error = %e,
                        "Failed to archive attachment"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Reads one archived attachment. `None` if it was never archived.
    pub async fn retrieve(
        &self,
        message_id: MessageId,
        attachment_id: Snowflake,
    ) -> AuditResult<Option<Vec<u8>>> {
        let key = Self::object_key(message_id, attachment_id);
        let data = self.blobs.get(&self.bucket, &key).await?;
        Ok(data.map(|b| b.to_vec()))
    }

    /// Reads back every archived attachment of a snapshot as uploads.
    ///
    /// Missing or unreadable objects are logged and left out.
    pub async fn retrieve_all(&self, snapshot: &MessageSnapshot) -> Vec<FileUpload> {
        let mut files = Vec::with_capacity(snapshot.attachments.len());
        for attachment in &snapshot.attachments {
            match self.retrieve(snapshot.id, attachment.id).await {
                Ok(Some(data)) => files.push(FileUpload::new(attachment.filename.clone(), data)),
                Ok(None) => {
                    debug!(
                        message_id = %snapshot.id,
                        attachment_id = %attachment.id,
                        "Attachment was not archived"
                    );
                }
                Err(e) => {
                    warn!(
                        message_id = %snapshot.id,
                        attachment_id = %attachment.id,
                        error = %e,
                        "Failed to retrieve attachment"
                    );
                }
            }
        }
        files
    }
}

impl std::fmt::Debug for AttachmentArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentArchive")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}
