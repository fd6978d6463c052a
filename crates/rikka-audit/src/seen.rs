//! The `seen` command: when a user last spoke.
//!
//! ```text
//! directory ["rikka", "seen"]
//!   └─ pack((location, user)) → unix time in nanoseconds, 8 bytes BE
//! ```
//!
//! `location` is a channel or a guild id. Every message sets both the channel
//! and the guild entry of its author; direct messages only have the channel.
//!
//! ```text
//! <prefix>seen            your own last message here
//! <prefix>seen <@user>    someone else's
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use rikka_core::{
    ChannelId, Embed, EventContext, EventKind, GatewayEvent, GuildId, Message, OutgoingMessage,
    Snowflake, User, UserId,
};
use rikka_framework::command::{self, USER_MENTION, extract_id};
use rikka_framework::{
    BoxedMiddleware, Command, DispatcherBuilder, EventHandler, ExcludeBotAuthors, HandlerError,
    HandlerResult, ResultExt, handler_fn,
};
use rikka_store::{Database, Directory, ReadTxn, StoreResult, Subspace, Tuple};
use time::OffsetDateTime;
use tracing::{debug, error};

use crate::command::InvokesCommand;
use crate::error::{AuditError, AuditResult};
use crate::render::DEFAULT_AVATAR_SIZE;

/// Default directory path of the last-seen table.
pub const SEEN_NAMESPACE: [&str; 2] = ["rikka", "seen"];

/// Name of the command.
pub const SEEN_COMMAND: &str = "seen";

/// Last-seen times of one user, as of one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastSeen {
    pub channel: Option<OffsetDateTime>,
    pub guild: Option<OffsetDateTime>,
}

/// Transactional last-seen table.
#[derive(Debug, Clone)]
pub struct SeenStore {
    db: Database,
    dir: Subspace,
}

impl SeenStore {
    pub fn new(db: Database, dir: Subspace) -> Self {
        Self { db, dir }
    }

    /// Creates or opens the table directory at `path`.
    pub fn provision(db: &Database, path: &[&str]) -> StoreResult<Self> {
        let dir = Directory::create_or_open(db, path)?;
        Ok(Self::new(db.clone(), dir))
    }

    pub fn key(&self, location: Snowflake, user_id: UserId) -> Vec<u8> {
        self.dir
            .pack(&Tuple::new().push(location.get()).push(user_id.get()))
    }

    /// Records that `user_id` spoke in `channel_id` at `at`.
    pub fn record(
        &self,
        user_id: UserId,
        channel_id: ChannelId,
        guild_id: Option<GuildId>,
        at: OffsetDateTime,
    ) -> AuditResult<()> {
        let value = encode_time(at);
        let channel_key = self.key(channel_id, user_id);
        let guild_key = guild_id.map(|guild_id| self.key(guild_id, user_id));
        self.db.transact(|txn| {
            txn.set(&channel_key, &value);
            if let Some(key) = &guild_key {
                txn.set(key, &value);
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Reads both times of `user_id` from one snapshot.
    pub fn last_seen(
        &self,
        user_id: UserId,
        channel_id: ChannelId,
        guild_id: Option<GuildId>,
    ) -> AuditResult<LastSeen> {
        let channel_key = self.key(channel_id, user_id);
        let guild_key = guild_id.map(|guild_id| self.key(guild_id, user_id));
        let (channel, guild) = self.db.read_transact(|txn| {
            let channel = txn.get(&channel_key)?;
            let guild = match &guild_key {
                Some(key) => txn.get(key)?,
                None => None,
            };
            Ok((channel, guild))
        })?;

        Ok(LastSeen {
            channel: channel.map(|raw| decode_time(&raw)).transpose()?,
            guild: guild.map(|raw| decode_time(&raw)).transpose()?,
        })
    }
}

fn encode_time(at: OffsetDateTime) -> [u8; 8] {
    // Times before 1970 clamp to the epoch.
    u64::try_from(at.unix_timestamp_nanos())
        .unwrap_or(0)
        .to_be_bytes()
}

fn decode_time(raw: &[u8]) -> AuditResult<OffsetDateTime> {
    let bytes: [u8; 8] = raw.try_into().map_err(|_| {
        AuditError::corrupt("last seen time", format!("expected 8 bytes, found {}", raw.len()))
    })?;
    let nanos = i128::from(u64::from_be_bytes(bytes));
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|e| AuditError::corrupt("last seen time", e.to_string()))
}

/// Renders `at` relative to `now`, e.g. `3 minutes ago`.
pub fn humanize(at: Option<OffsetDateTime>, now: OffsetDateTime) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;
    const WEEK: u64 = 7 * DAY;
    const MONTH: u64 = 30 * DAY;
    const YEAR: u64 = 365 * DAY;

    let Some(at) = at else {
        return "never".to_string();
    };
    let delta = (now - at).whole_seconds();
    let suffix = if delta >= 0 { "ago" } else { "from now" };
    let (count, unit) = match delta.unsigned_abs() {
        0 => return "now".to_string(),
        s if s < MINUTE => (s, "second"),
        s if s < HOUR => (s / MINUTE, "minute"),
        s if s < DAY => (s / HOUR, "hour"),
        s if s < WEEK => (s / DAY, "day"),
        s if s < MONTH => (s / WEEK, "week"),
        s if s < YEAR => (s / MONTH, "month"),
        s => (s / YEAR, "year"),
    };
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} {suffix}")
}

// ============================================================================
// SeenCommand
// ============================================================================

/// Tracks message authors and answers `seen`.
#[derive(Debug, Clone)]
pub struct SeenCommand {
    prefix: String,
    store: SeenStore,
    avatar_size: u16,
}

impl SeenCommand {
    pub fn new(prefix: impl Into<String>, store: SeenStore) -> Self {
        Self {
            prefix: prefix.into(),
            store,
            avatar_size: DEFAULT_AVATAR_SIZE,
        }
    }

    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    /// Stamps the author of `message` with the current time.
    pub fn observe(&self, message: &Message) {
        let Some(author_id) = message.author_id() else {
            return;
        };
        let now = OffsetDateTime::now_utc();
        if let Err(e) = self
            .store
            .record(author_id, message.channel_id, message.guild_id, now)
        {
            error!(user_id = %author_id, error = %e, "Failed to record last seen time");
        }
    }

    /// Builds the reply: `user`'s avatar, both times, and the bot in the footer.
    pub fn render(&self, user: &User, me: &User, seen: LastSeen, now: OffsetDateTime) -> OutgoingMessage {
        let embed = Embed::new("Last seen")
            .thumbnail(user.avatar_url(self.avatar_size))
            .field("Channel", humanize(seen.channel, now), false)
            .field("Guild", humanize(seen.guild, now), false)
            .footer("Rikka", me.avatar_url(self.avatar_size));
        OutgoingMessage::embed(embed)
    }

    async fn reply(&self, ctx: &EventContext, message: &Message, out: OutgoingMessage) -> HandlerResult {
        ctx.gateway()
            .send_message(message.channel_id, out)
            .await
            .context("Failed to send reply")?;
        Ok(())
    }
}

impl Command for SeenCommand {
    fn register(&self, builder: &mut DispatcherBuilder) {
        let seen = self.clone();
        builder.register(
            EventKind::MessageCreate,
            vec![Arc::new(ExcludeBotAuthors) as BoxedMiddleware],
            handler_fn(move |ctx: Arc<EventContext>| {
                let seen = seen.clone();
                async move {
                    if let GatewayEvent::MessageCreate(message) = ctx.event() {
                        seen.observe(message);
                    }
                    Ok(())
                }
            }),
        );

        builder.register(
            EventKind::MessageCreate,
            vec![
                Arc::new(ExcludeBotAuthors) as BoxedMiddleware,
                Arc::new(InvokesCommand::new(&self.prefix, SEEN_COMMAND)),
            ],
            self.clone(),
        );
    }
}

#[async_trait]
impl EventHandler for SeenCommand {
    async fn handle(&self, ctx: Arc<EventContext>) -> HandlerResult {
        let GatewayEvent::MessageCreate(message) = ctx.event() else {
            return Ok(());
        };

        let mut args = command::parse_args(&self.prefix, &message.content);
        let user_id = match args.len() {
            0 => message
                .author_id()
                .ok_or_else(|| HandlerError::new("Failed to find user", "message has no author"))?,
            1 => {
                let raw = args.require("user").context("Failed to parse user id")?;
                extract_id(&USER_MENTION, &raw).context("Failed to parse user id")?
            }
            _ => {
                return self
                    .reply(&ctx, message, OutgoingMessage::text("Please only supply one user"))
                    .await;
            }
        };

        let gateway = ctx.gateway();
        let user = gateway
            .get_user(user_id)
            .await
            .context("Failed to find user")?;
        let seen = self
            .store
            .last_seen(user_id, message.channel_id, message.guild_id)
            .context("Failed to load last seen times")?;
        let me = gateway.current_user().await.context("Failed to load self")?;

        debug!(user_id = %user_id, ?seen, "Answering seen");
        let out = self.render(&user, &me, seen, OffsetDateTime::now_utc());
        self.reply(&ctx, message, out).await
    }
}
