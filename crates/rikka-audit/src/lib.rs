//! # Rikka Audit
//!
//! Per-guild message audit logging.
//!
//! - **Configuration**: [`AuditConfigStore`], the delete/update log flags of
//!   every guild
//! - **Snapshots**: [`MessageSnapshotCache`], the last known copy of every
//!   tracked message, with an optional [`RetentionPolicy`]
//! - **Attachments**: [`AttachmentArchive`] over the [`BlobStore`] and
//!   [`AttachmentFetcher`] seams
//! - **Rendering**: [`AuditRenderer`]
//! - **Wiring**: the [`MessageLog`] section and the [`LogCommand`] that
//!   configures it
//! - **Last seen**: [`SeenCommand`] over the [`SeenStore`] table
//!
//! ```rust,ignore
//! let keys = AuditKeys::provision(&db, &DEFAULT_NAMESPACE)?;
//! let config = AuditConfigStore::new(db.clone(), keys.clone());
//! let snapshots = MessageSnapshotCache::new(db, keys, config.clone());
//! let archive = AttachmentArchive::new(blobs, fetcher);
//! archive.ensure_bucket().await?;
//!
//! let log = LogCommand::new("r.", owner_id)
//!     .with_section(Arc::new(MessageLog::new(config, snapshots, archive)));
//! builder.install(&log);
//! ```

pub mod archive;
pub mod blob;
pub mod command;
pub mod config_store;
pub mod error;
pub mod fetch;
pub mod keys;
pub mod render;
pub mod section;
pub mod seen;
pub mod snapshot;

pub use archive::{ArchiveReport, AttachmentArchive, DEFAULT_BUCKET};
pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use command::{LOG_COMMAND, LogCommand};
pub use config_store::{AuditConfigStore, GuildAuditConfig, LogKind};
pub use error::{
    AuditError, AuditResult, BlobError, BlobResult, FetchError, FetchResult,
};
pub use fetch::AttachmentFetcher;
#[cfg(feature = "http-fetch")]
pub use fetch::HttpFetcher;
pub use keys::{AuditKeys, DEFAULT_NAMESPACE};
pub use render::AuditRenderer;
pub use section::{LogSection, MessageLog};
pub use seen::{LastSeen, SEEN_COMMAND, SEEN_NAMESPACE, SeenCommand, SeenStore};
pub use snapshot::{MessageSnapshot, MessageSnapshotCache, RetentionPolicy, StoreOutcome};
