//! Per-guild audit log configuration.
//!
//! Each guild has two independent flags, one per [`LogKind`]. A flag is
//! present exactly when the feature is enabled, and its value is the log
//! channel as an 8-byte big-endian id.

use std::fmt;

use rikka_core::{ChannelId, GuildId, Snowflake};
use rikka_store::{Database, ReadTxn};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuditError, AuditResult};
use crate::keys::AuditKeys;

/// The two audit log features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Delete,
    Update,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Delete => "delete",
            LogKind::Update => "update",
        }
    }

    /// Parses a command argument, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "delete" => Some(LogKind::Delete),
            "update" => Some(LogKind::Update),
            _ => None,
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The audit configuration of one guild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildAuditConfig {
    pub delete_log_channel: Option<ChannelId>,
    pub update_log_channel: Option<ChannelId>,
}

impl GuildAuditConfig {
    /// Returns `true` if either log is enabled.
    pub fn is_enabled(&self) -> bool {
        self.delete_log_channel.is_some() || self.update_log_channel.is_some()
    }

    pub fn channel(&self, kind: LogKind) -> Option<ChannelId> {
        match kind {
            LogKind::Delete => self.delete_log_channel,
            LogKind::Update => self.update_log_channel,
        }
    }
}

/// Transactional store of per-guild audit flags.
#[derive(Debug, Clone)]
pub struct AuditConfigStore {
    db: Database,
    keys: AuditKeys,
}

impl AuditConfigStore {
    pub fn new(db: Database, keys: AuditKeys) -> Self {
        Self { db, keys }
    }

    fn flag_key(&self, kind: LogKind, guild_id: GuildId) -> Vec<u8> {
        match kind {
            LogKind::Delete => self.keys.delete_flag(guild_id),
            LogKind::Update => self.keys.update_flag(guild_id),
        }
    }

    /// Points `kind` logs of `guild_id` at `channel_id`, replacing any previous
    /// channel.
    pub fn enable(&self, kind: LogKind, guild_id: GuildId, channel_id: ChannelId) -> AuditResult<()> {
        let key = self.flag_key(kind, guild_id);
        let value = channel_id.get().to_be_bytes();
        self.db.transact(|txn| {
            txn.set(&key, &value);
            Ok(())
        })?;
        debug!(kind = %kind, guild_id = %guild_id, channel_id = %channel_id, "Audit log enabled");
        Ok(())
    }

    /// Turns `kind` logs of `guild_id` off. Returns whether they were on.
    pub fn disable(&self, kind: LogKind, guild_id: GuildId) -> AuditResult<bool> {
        let key = self.flag_key(kind, guild_id);
        let was_enabled = self.db.transact(|txn| {
            let present = txn.get(&key)?.is_some();
            if present {
                txn.clear(&key);
            }
            Ok(present)
        })?;
        debug!(kind = %kind, guild_id = %guild_id, was_enabled, "Audit log disabled");
        Ok(was_enabled)
    }

    /// Returns the channel `kind` logs of `guild_id` go to, if enabled.
    pub fn log_channel(&self, kind: LogKind, guild_id: GuildId) -> AuditResult<Option<ChannelId>> {
        let key = self.flag_key(kind, guild_id);
        let raw = self.db.read_transact(|txn| txn.get(&key))?;
        raw.map(|raw| decode_channel(kind, &raw)).transpose()
    }

    pub fn enable_delete_log(&self, guild_id: GuildId, channel_id: ChannelId) -> AuditResult<()> {
        self.enable(LogKind::Delete, guild_id, channel_id)
    }

    pub fn enable_update_log(&self, guild_id: GuildId, channel_id: ChannelId) -> AuditResult<()> {
        self.enable(LogKind::Update, guild_id, channel_id)
    }

    pub fn disable_delete_log(&self, guild_id: GuildId) -> AuditResult<bool> {
        self.disable(LogKind::Delete, guild_id)
    }

    pub fn disable_update_log(&self, guild_id: GuildId) -> AuditResult<bool> {
        self.disable(LogKind::Update, guild_id)
    }

    pub fn delete_log_channel(&self, guild_id: GuildId) -> AuditResult<Option<ChannelId>> {
        self.log_channel(LogKind::Delete, guild_id)
    }

    pub fn update_log_channel(&self, guild_id: GuildId) -> AuditResult<Option<ChannelId>> {
        self.log_channel(LogKind::Update, guild_id)
    }

    /// Reads both flags of `guild_id` from one snapshot.
    pub fn config(&self, guild_id: GuildId) -> AuditResult<GuildAuditConfig> {
        let delete_key = self.keys.delete_flag(guild_id);
        let update_key = self.keys.update_flag(guild_id);
        let (delete, update) = self
            .db
            .read_transact(|txn| Ok((txn.get(&delete_key)?, txn.get(&update_key)?)))?;

        Ok(GuildAuditConfig {
            delete_log_channel: delete
                .map(|raw| decode_channel(LogKind::Delete, &raw))
                .transpose()?,
            update_log_channel: update
                .map(|raw| decode_channel(LogKind::Update, &raw))
                .transpose()?,
        })
    }

    /// Returns `true` if either log is enabled for `guild_id`.
    pub fn is_enabled(&self, guild_id: GuildId) -> AuditResult<bool> {
        let delete_key = self.keys.delete_flag(guild_id);
        let update_key = self.keys.update_flag(guild_id);
        Ok(self.db.read_transact(|txn| {
            Ok(txn.get(&delete_key)?.is_some() || txn.get(&update_key)?.is_some())
        })?)
    }
}

fn decode_channel(kind: LogKind, raw: &[u8]) -> AuditResult<ChannelId> {
    let bytes: [u8; 8] = raw.try_into().map_err(|_| {
        AuditError::corrupt(
            match kind {
                LogKind::Delete => "delete log flag",
                LogKind::Update => "update log flag",
            },
            format!("expected 8 bytes, found {}", raw.len()),
        )
    })?;
    Ok(Snowflake(u64::from_be_bytes(bytes)))
}
