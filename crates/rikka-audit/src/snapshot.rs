//! Durable message snapshots.
//!
//! Every message posted in a guild with audit logging enabled is written as a
//! JSON document keyed by its id. Edits overwrite the document; there is no
//! revision history. Because message ids are snowflakes and the key encoding
//! preserves integer order, the snapshot table is sorted by message age,
//! which makes retention pruning a single range clear.

use std::time::Duration;

use rikka_core::{Message, MessageId, Snowflake};
use rikka_store::{Database, ReadTxn, Tuple};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::config_store::AuditConfigStore;
use crate::error::AuditResult;
use crate::keys::AuditKeys;

/// The stored copy of a message.
pub type MessageSnapshot = Message;

/// Result of [`MessageSnapshotCache::store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The snapshot was written.
    Stored,
    /// Audit logging is off for the message's guild, or it has no guild.
    Skipped,
}

/// How long snapshots are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Snapshots are never pruned.
    #[default]
    Forever,
    /// Snapshots of messages older than the given age are pruned.
    MaxAge(Duration),
}

impl RetentionPolicy {
    /// Returns the oldest message id that survives a prune at `now`, or `None`
    /// when nothing is ever pruned.
    pub fn cutoff(&self, now: OffsetDateTime) -> Option<Snowflake> {
        match self {
            RetentionPolicy::Forever => None,
            RetentionPolicy::MaxAge(age) => {
                let age = time::Duration::try_from(*age).unwrap_or(time::Duration::MAX);
                let at = now.checked_sub(age).unwrap_or(OffsetDateTime::UNIX_EPOCH);
                Some(Snowflake::from_datetime(at))
            }
        }
    }
}

/// Message snapshots in the transactional store.
#[derive(Debug, Clone)]
pub struct MessageSnapshotCache {
    db: Database,
    keys: AuditKeys,
    config: AuditConfigStore,
    retention: RetentionPolicy,
}

impl MessageSnapshotCache {
    pub fn new(db: Database, keys: AuditKeys, config: AuditConfigStore) -> Self {
        Self {
            db,
            keys,
            config,
            retention: RetentionPolicy::default(),
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Writes a snapshot of `message` if its guild has audit logging enabled.
    pub fn store(&self, message: &Message) -> AuditResult<StoreOutcome> {
        let Some(guild_id) = message.guild_id else {
            return Ok(StoreOutcome::Skipped);
        };
        if !self.config.is_enabled(guild_id)? {
            return Ok(StoreOutcome::Skipped);
        }

        let key = self.keys.snapshot(message.id);
        let doc = serde_json::to_vec(message)?;
        self.db.transact(|txn| {
            txn.set(&key, &doc);
            Ok(())
        })?;

        debug!(message_id = %message.id, guild_id = %guild_id, bytes = doc.len(), "Stored message snapshot");
        Ok(StoreOutcome::Stored)
    }

    /// Reads the snapshot of `message_id`. `None` if it was never stored.
    pub fn fetch(&self, message_id: MessageId) -> AuditResult<Option<MessageSnapshot>> {
        let key = self.keys.snapshot(message_id);
        let raw = self.db.read_transact(|txn| txn.get(&key))?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    /// Removes every snapshot older than the retention policy allows at `now`.
    ///
    /// Returns the id below which snapshots were cleared, or `None` when the
    /// policy keeps everything.
    pub fn prune(&self, now: OffsetDateTime) -> AuditResult<Option<Snowflake>> {
        let Some(cutoff) = self.retention.cutoff(now) else {
            return Ok(None);
        };

        let snapshots = self.keys.snapshots();
        let (begin, _) = snapshots.range();
        let end = snapshots.pack(&Tuple::from(cutoff.get()));
        self.db.transact(|txn| {
            txn.clear_range(&begin, &end);
            Ok(())
        })?;

        info!(cutoff = %cutoff, "Pruned message snapshots");
        Ok(Some(cutoff))
    }
}
