use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rikka_audit::{
    AttachmentFetcher, BlobError, BlobResult, BlobStore, FetchResult, MemoryBlobStore,
};
use rikka_core::{
    Channel, ChannelId, Gateway, GatewayError, GatewayEvent, GatewayResult, Guild, GuildId,
    Message, MessageId, OutgoingMessage, Ready, Snowflake, User, UserId,
};
use rikka_runtime::{ConfigError, RikkaConfig, RikkaRuntime, RunStats, RuntimeError};
use rikka_store::Database;
use time::{Duration, OffsetDateTime};
use tokio::sync::mpsc;

const GUILD: Snowflake = Snowflake(42);
const CHAT: Snowflake = Snowflake(10);
const LOG: Snowflake = Snowflake(99);
const OWNER: Snowflake = Snowflake(7);

// ============================================================================
// Fixtures
// ============================================================================

/// Guild 42 owned by user 7, with channels 10 and 99.
#[derive(Default)]
struct TestGateway {
    sent: Mutex<Vec<(ChannelId, String)>>,
}

#[async_trait]
impl Gateway for TestGateway {
    async fn send_message(
        &self,
        channel_id: ChannelId,
        message: OutgoingMessage,
    ) -> GatewayResult<Message> {
        self.sent.lock().push((channel_id, message.content.clone()));
        Ok(Message {
            id: Snowflake(9_000),
            channel_id,
            guild_id: Some(GUILD),
            author: None,
            content: message.content,
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
        Ok(user(user_id))
    }

    async fn get_guild(&self, guild_id: GuildId) -> GatewayResult<Guild> {
        if guild_id != GUILD {
            return Err(GatewayError::not_found("guild", guild_id));
        }
        Ok(Guild {
            id: GUILD,
            name: "Takanashi".into(),
            owner_id: OWNER,
            icon: None,
        })
    }

    async fn get_channel(&self, channel_id: ChannelId) -> GatewayResult<Channel> {
        if channel_id != CHAT && channel_id != LOG {
            return Err(GatewayError::not_found("channel", channel_id));
        }
        Ok(Channel {
            id: channel_id,
            guild_id: Some(GUILD),
            name: None,
        })
    }

    async fn current_user(&self) -> GatewayResult<User> {
        Ok(bot_user())
    }
}

struct StubFetcher;

#[async_trait]
impl AttachmentFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Bytes> {
        Ok(Bytes::from(url.to_string()))
    }
}

/// Rejects bucket creation.
struct ReadOnlyBlobStore;

#[async_trait]
impl BlobStore for ReadOnlyBlobStore {
    async fn bucket_exists(&self, _bucket: &str) -> BlobResult<bool> {
        Ok(false)
    }

    async fn create_bucket(&self, _bucket: &str) -> BlobResult<()> {
        Err(BlobError::Backend("read-only".into()))
    }

    async fn put(&self, bucket: &str, _key: &str, _data: Bytes) -> BlobResult<()> {
        Err(BlobError::NoSuchBucket(bucket.into()))
    }

    async fn get(&self, _bucket: &str, _key: &str) -> BlobResult<Option<Bytes>> {
        Ok(None)
    }
}

fn user(id: UserId) -> User {
    User {
        id,
        username: format!("user{id}"),
        discriminator: "0".into(),
        bot: false,
        avatar: None,
    }
}

fn bot_user() -> User {
    User {
        bot: true,
        ..user(Snowflake(2))
    }
}

fn say(id: MessageId, author: UserId, content: &str) -> GatewayEvent {
    GatewayEvent::MessageCreate(Message {
        id,
        channel_id: CHAT,
        guild_id: Some(GUILD),
        author: Some(user(author)),
        content: content.into(),
        attachments: vec![],
        timestamp: OffsetDateTime::now_utc(),
        edited_timestamp: None,
    })
}

async fn runtime(config: RikkaConfig) -> RikkaRuntime {
    RikkaRuntime::builder()
        .config(config)
        .without_logging()
        .database(Database::in_memory())
        .blob_store(Arc::new(MemoryBlobStore::new()))
        .fetcher(Arc::new(StubFetcher))
        .build()
        .await
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_run_dispatches_until_stream_closes() {
    let runtime = runtime(RikkaConfig::default()).await;
    let gateway = Arc::new(TestGateway::default());

    let (tx, rx) = mpsc::channel(8);
    tx.send(GatewayEvent::Ready(Ready {
        user: bot_user(),
        session_id: "abc".into(),
        guild_count: 1,
    }))
    .await
    .unwrap();
    tx.send(say(Snowflake(5_000), OWNER, "r.log messages delete enable <#99>"))
        .await
        .unwrap();
    drop(tx);

    let stats = runtime.run(gateway.clone(), rx).await;

    // Ready has no handlers; the command message runs both trackers and `log`.
    assert_eq!(
        stats,
        RunStats {
            events: 2,
            handlers_run: 3,
            panicked: 0,
        }
    );
    assert_eq!(
        runtime.audit_config().delete_log_channel(GUILD).unwrap(),
        Some(LOG)
    );
    assert_eq!(
        *gateway.sent.lock(),
        vec![(CHAT, "Enabled delete logs in <#99>".to_string())]
    );
}

#[tokio::test]
async fn test_custom_prefix_and_owner() {
    let mut config = RikkaConfig::default();
    config.bot.prefix = "!".into();
    config.bot.owner_id = 1;
    let runtime = runtime(config).await;
    let gateway = Arc::new(TestGateway::default());

    let (tx, rx) = mpsc::channel(8);
    tx.send(say(Snowflake(5_000), Snowflake(1), "!log messages update enable 99"))
        .await
        .unwrap();
    drop(tx);
    runtime.run(gateway.clone(), rx).await;

    assert_eq!(
        runtime.audit_config().update_log_channel(GUILD).unwrap(),
        Some(LOG)
    );
}

#[tokio::test]
async fn test_seen_command_is_optional() {
    let with_seen = runtime(RikkaConfig::default()).await;

    let mut config = RikkaConfig::default();
    config.bot.seen = false;
    let without_seen = runtime(config).await;

    assert_eq!(
        with_seen.dispatcher().registration_count(),
        without_seen.dispatcher().registration_count() + 2
    );
    assert_eq!(
        with_seen
            .dispatcher()
            .registrations_for(rikka_core::EventKind::MessageCreate),
        4
    );
}

#[tokio::test]
async fn test_cancelled_runtime_stops() {
    let runtime = runtime(RikkaConfig::default()).await;
    let (_tx, rx) = mpsc::channel(8);

    runtime.shutdown();
    let stats = runtime.run(Arc::new(TestGateway::default()), rx).await;

    assert_eq!(stats, RunStats::default());
}

#[tokio::test]
async fn test_bucket_provisioning_failure() {
    let err = RikkaRuntime::builder()
        .config(RikkaConfig::default())
        .without_logging()
        .database(Database::in_memory())
        .blob_store(Arc::new(ReadOnlyBlobStore))
        .fetcher(Arc::new(StubFetcher))
        .build()
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        RuntimeError::Provision {
            what: "attachment bucket",
            ..
        }
    ));
}

#[cfg(not(feature = "rocksdb"))]
#[tokio::test]
async fn test_missing_database_is_rejected() {
    let err = RikkaRuntime::builder()
        .config(RikkaConfig::default())
        .without_logging()
        .blob_store(Arc::new(MemoryBlobStore::new()))
        .fetcher(Arc::new(StubFetcher))
        .build()
        .await
        .err()
        .unwrap();

    assert!(matches!(err, RuntimeError::MissingDatabase));
}

#[cfg(feature = "rocksdb")]
#[tokio::test]
async fn test_configured_database_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RikkaConfig::default();
    config.storage.path = dir.path().join("db");
    config.storage.sync_writes = false;

    let build = || async {
        RikkaRuntime::builder()
            .config(config.clone())
            .without_logging()
            .blob_store(Arc::new(MemoryBlobStore::new()))
            .fetcher(Arc::new(StubFetcher))
            .build()
            .await
            .unwrap()
    };

    let first = build().await;
    first.audit_config().enable_delete_log(GUILD, LOG).unwrap();
    drop(first);

    let second = build().await;
    assert_eq!(
        second.audit_config().delete_log_channel(GUILD).unwrap(),
        Some(LOG)
    );
}

#[cfg(feature = "rocksdb")]
#[tokio::test]
async fn test_unopenable_database_fails_provisioning() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("db");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let mut config = RikkaConfig::default();
    config.storage.path = blocker;
    let err = RikkaRuntime::builder()
        .config(config)
        .without_logging()
        .blob_store(Arc::new(MemoryBlobStore::new()))
        .fetcher(Arc::new(StubFetcher))
        .build()
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        RuntimeError::Provision {
            what: "database",
            ..
        }
    ));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = RikkaConfig::default();
    config.audit.bucket = "Attachments".into();

    let err = RikkaRuntime::builder()
        .config(config)
        .without_logging()
        .blob_store(Arc::new(MemoryBlobStore::new()))
        .fetcher(Arc::new(StubFetcher))
        .build()
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        RuntimeError::Config(ConfigError::InvalidBucket { .. })
    ));
}

#[tokio::test]
async fn test_prune_drops_expired_snapshots() {
    let mut config = RikkaConfig::default();
    config.audit.retention.max_age_days = Some(1);
    let runtime = runtime(config).await;
    runtime
        .audit_config()
        .enable_delete_log(GUILD, LOG)
        .unwrap();

    let gateway = Arc::new(TestGateway::default());
    let old = Snowflake::from_datetime(OffsetDateTime::now_utc() - Duration::days(3));
    let fresh = Snowflake::from_datetime(OffsetDateTime::now_utc());
    for id in [old, fresh] {
        runtime
            .dispatcher()
            .dispatch(say(id, Snowflake(8), "hello"), gateway.clone())
            .await;
    }
    assert!(runtime.snapshots().fetch(old).unwrap().is_some());

    assert!(runtime.prune_now().is_some());
    assert_eq!(runtime.snapshots().fetch(old).unwrap(), None);
    assert!(runtime.snapshots().fetch(fresh).unwrap().is_some());
}
