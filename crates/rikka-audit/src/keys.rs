//! Key layout of the message-tracking namespace.
//!
//! ```text
//! directory ["app", "logs", "message_track"]
//!   ├─ 0  delete-log flags   pack((guild,))   → channel id, 8 bytes BE
//!   ├─ 1  update-log flags   pack((guild,))   → channel id, 8 bytes BE
//!   └─ 2  message snapshots  pack((message,)) → JSON document
//! ```

use rikka_core::{GuildId, MessageId};
use rikka_store::{Database, Directory, StoreResult, Subspace, Tuple};

/// Default directory path of the message-tracking namespace.
pub const DEFAULT_NAMESPACE: [&str; 3] = ["app", "logs", "message_track"];

/// The three subspaces of the message-tracking namespace.
#[derive(Debug, Clone)]
pub struct AuditKeys {
    delete_flags: Subspace,
    update_flags: Subspace,
    snapshots: Subspace,
}

impl AuditKeys {
    /// Derives the subspaces from the namespace directory.
    pub fn new(dir: &Subspace) -> Self {
        Self {
            delete_flags: dir.subspace(0),
            update_flags: dir.subspace(1),
            snapshots: dir.subspace(2),
        }
    }

    /// Creates or opens the namespace directory at `path`.
    pub fn provision(db: &Database, path: &[&str]) -> StoreResult<Self> {
        let dir = Directory::create_or_open(db, path)?;
        Ok(Self::new(&dir))
    }

    pub fn delete_flag(&self, guild_id: GuildId) -> Vec<u8> {
        self.delete_flags.pack(&Tuple::from(guild_id.get()))
    }

    pub fn update_flag(&self, guild_id: GuildId) -> Vec<u8> {
        self.update_flags.pack(&Tuple::from(guild_id.get()))
    }

    pub fn snapshot(&self, message_id: MessageId) -> Vec<u8> {
        self.snapshots.pack(&Tuple::from(message_id.get()))
    }

    /// The subspace holding every snapshot.
    pub fn snapshots(&self) -> &Subspace {
        &self.snapshots
    }
}
