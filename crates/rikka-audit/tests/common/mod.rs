//! Shared fixtures for the audit scenario tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rikka_audit::{
    AttachmentArchive, AttachmentFetcher, AuditConfigStore, AuditKeys, BlobError, BlobResult,
    BlobStore, DEFAULT_NAMESPACE, FetchError, FetchResult, LogCommand, MemoryBlobStore, MessageLog,
    MessageSnapshotCache,
};
use rikka_core::{
    Attachment, Channel, ChannelId, Gateway, GatewayError, GatewayEvent, GatewayResult, Guild,
    GuildId, Message, MessageDelete, MessageId, OutgoingMessage, Snowflake, User, UserId,
};
use rikka_framework::{Dispatcher, DispatcherBuilder};
use rikka_store::Database;
use time::OffsetDateTime;

pub const PREFIX: &str = "r.";
pub const GUILD: Snowflake = Snowflake(42);
pub const CHAT: Snowflake = Snowflake(10);
pub const LOG: Snowflake = Snowflake(99);
pub const OWNER: Snowflake = Snowflake(7);
pub const MEMBER: Snowflake = Snowflake(8);
pub const OPERATOR: Snowflake = Snowflake(1);

// ============================================================================
// Gateway
// ============================================================================

/// A gateway serving canned metadata and recording every outbound message.
#[derive(Default)]
pub struct RecordingGateway {
    users: HashMap<UserId, User>,
    guilds: HashMap<GuildId, Guild>,
    channels: HashMap<ChannelId, Channel>,
    pub sent: Mutex<Vec<(ChannelId, OutgoingMessage)>>,
}

impl RecordingGateway {
    /// Guild 42 owned by user 7, with a chat channel 10 and a log channel 99.
    pub fn standard() -> Self {
        let mut gw = Self::default();
        gw.guilds.insert(
            GUILD,
            Guild {
                id: GUILD,
                name: "Takanashi".into(),
                owner_id: OWNER,
                icon: None,
            },
        );
        for (id, name) in [(CHAT, "general"), (LOG, "audit")] {
            gw.channels.insert(
                id,
                Channel {
                    id,
                    guild_id: Some(GUILD),
                    name: Some(name.into()),
                },
            );
        }
        for id in [OWNER, MEMBER] {
            gw.users.insert(id, user(id));
        }
        gw
    }

    pub fn sent(&self) -> Vec<(ChannelId, OutgoingMessage)> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, channel: ChannelId) -> Vec<OutgoingMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn texts_to(&self, channel: ChannelId) -> Vec<String> {
        self.sent_to(channel).into_iter().map(|m| m.content).collect()
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn send_message(
        &self,
        channel_id: ChannelId,
        message: OutgoingMessage,
    ) -> GatewayResult<Message> {
        let content = message.content.clone();
        self.sent.lock().push((channel_id, message));
        Ok(Message {
            id: Snowflake(9_000),
            channel_id,
            guild_id: Some(GUILD),
            author: None,
            content,
            attachments: vec![],
            timestamp: OffsetDateTime::now_utc(),
            edited_timestamp: None,
        })
    }

    async fn edit_message(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
        _content: String,
    ) -> GatewayResult<Message> {
        Err(GatewayError::not_found("message", message_id))
    }

    async fn get_user(&self, user_id: UserId) -> GatewayResult<User> {
        self.users
            .get(&user_id)
            .cloned()
            .ok_or(GatewayError::not_found("user", user_id))
    }

    async fn get_guild(&self, guild_id: GuildId) -> GatewayResult<Guild> {
        self.guilds
            .get(&guild_id)
            .cloned()
            .ok_or(GatewayError::not_found("guild", guild_id))
    }

    async fn get_channel(&self, channel_id: ChannelId) -> GatewayResult<Channel> {
        self.channels
            .get(&channel_id)
            .cloned()
            .ok_or(GatewayError::not_found("channel", channel_id))
    }

    async fn current_user(&self) -> GatewayResult<User> {
        let mut me = user(Snowflake(2));
        me.bot = true;
        Ok(me)
    }
}

// ============================================================================
// Attachments
// ============================================================================

/// Serves `contents:<url>` for every URL.
pub struct EchoFetcher;

#[async_trait]
impl AttachmentFetcher for EchoFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Bytes> {
        if url.is_empty() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(Bytes::from(format!("contents:{url}")))
    }
}

/// An [`EchoFetcher`] that records every URL it serves.
#[derive(Default)]
pub struct CountingFetcher {
    pub urls: Mutex<Vec<String>>,
}

impl CountingFetcher {
    pub fn count(&self) -> usize {
        self.urls.lock().len()
    }
}

#[async_trait]
impl AttachmentFetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Bytes> {
        self.urls.lock().push(url.to_string());
        EchoFetcher.fetch(url).await
    }
}

/// A memory blob store whose uploads fail for keys ending in `fail_suffix`.
pub struct FailingBlobStore {
    inner: MemoryBlobStore,
    fail_suffix: String,
}

impl FailingBlobStore {
    pub fn new(fail_suffix: impl Into<String>) -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            fail_suffix: fail_suffix.into(),
        }
    }
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn bucket_exists(&self, bucket: &str) -> BlobResult<bool> {
        self.inner.bucket_exists(bucket).await
    }

    async fn create_bucket(&self, bucket: &str) -> BlobResult<()> {
        self.inner.create_bucket(bucket).await
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> BlobResult<()> {
        if key.ends_with(&self.fail_suffix) {
            return Err(BlobError::Backend("upload rejected".into()));
        }
        self.inner.put(bucket, key, data).await
    }

    async fn get(&self, bucket: &str, key: &str) -> BlobResult<Option<Bytes>> {
        self.inner.get(bucket, key).await
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A dispatcher with the `log` command and message log installed.
pub struct Harness {
    pub db: Database,
    pub config: AuditConfigStore,
    pub snapshots: MessageSnapshotCache,
    pub gateway: Arc<RecordingGateway>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub async fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_fetcher(blobs, Arc::new(EchoFetcher)).await
    }

    pub async fn with_fetcher(
        blobs: Arc<dyn BlobStore>,
        fetcher: Arc<dyn AttachmentFetcher>,
    ) -> Self {
        let db = Database::in_memory();
        let keys = AuditKeys::provision(&db, &DEFAULT_NAMESPACE).unwrap();
        let config = AuditConfigStore::new(db.clone(), keys.clone());
        let snapshots = MessageSnapshotCache::new(db.clone(), keys, config.clone());
        let archive = AttachmentArchive::new(blobs, fetcher);
        archive.ensure_bucket().await.unwrap();

        let log = LogCommand::new(PREFIX, OPERATOR).with_section(Arc::new(MessageLog::new(
            config.clone(),
            snapshots.clone(),
            archive,
        )));
        let mut builder = DispatcherBuilder::new();
        builder.install(&log);

        Self {
            db,
            config,
            snapshots,
            gateway: Arc::new(RecordingGateway::standard()),
            dispatcher: builder.build(),
        }
    }

    pub async fn with_memory_blobs() -> Self {
        Self::new(Arc::new(MemoryBlobStore::new())).await
    }

    pub async fn dispatch(&self, event: GatewayEvent) -> usize {
        self.dispatcher.dispatch(event, self.gateway.clone()).await
    }

    /// Sends `content` as `author` in the chat channel.
    pub async fn say(&self, author: Snowflake, content: &str) -> usize {
        let mut msg = message(5_000, content);
        msg.author = Some(user(author));
        self.dispatch(GatewayEvent::MessageCreate(msg)).await
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn user(id: Snowflake) -> User {
    User {
        id,
        username: format!("user{id}"),
        discriminator: "0".into(),
        bot: false,
        avatar: Some("hash".into()),
    }
}

/// A message by user 8 in the chat channel of guild 42.
pub fn message(id: u64, content: &str) -> Message {
    Message {
        id: Snowflake(id),
        channel_id: CHAT,
        guild_id: Some(GUILD),
        author: Some(user(MEMBER)),
        content: content.into(),
        attachments: vec![],
        timestamp: OffsetDateTime::now_utc(),
        edited_timestamp: None,
    }
}

pub fn attachment(id: u64, filename: &str) -> Attachment {
    Attachment {
        id: Snowflake(id),
        filename: filename.into(),
        url: format!("https://cdn.example/{id}/{filename}"),
        proxy_url: Some(format!("https://media.example/{id}/{filename}")),
        size: 16,
    }
}

pub fn deleted(id: u64) -> GatewayEvent {
    GatewayEvent::MessageDelete(MessageDelete {
        id: Snowflake(id),
        channel_id: CHAT,
        guild_id: Some(GUILD),
    })
}
