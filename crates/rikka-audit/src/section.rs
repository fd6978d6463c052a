//! Log sections and message logging.
//!
//! A [`LogSection`] is one family of audit logs, configured through
//! `log <section> ...` and installing its own event handlers. The only
//! section today is [`MessageLog`]:
//!
//! | event            | action                                                  |
//! |------------------|---------------------------------------------------------|
//! | `MESSAGE_CREATE` | archive attachments, then store a snapshot              |
//! | `MESSAGE_UPDATE` | post old/new content to the update log, re-snapshot     |
//! |                  | archiving only attachments the old snapshot lacks       |
//! | `MESSAGE_DELETE` | post the snapshot and its attachments to the delete log |
//!
//! Every tracking handler is gated by [`ExcludeBotAuthors`]. Failures in these
//! handlers are logged and dropped: nobody invoked them, so there is nobody
//! to tell.

use std::sync::Arc;

use async_trait::async_trait;
use rikka_core::{
    Channel, ChannelId, EventContext, EventKind, GatewayEvent, GuildId, Message, MessageDelete,
    OutgoingMessage,
};
use rikka_framework::command::{CHANNEL_MENTION, extract_id};
use rikka_framework::{
    Args, BoxedMiddleware, Command, DispatcherBuilder, ExcludeBotAuthors, HandlerError,
    HandlerResult, ResultExt, handler_fn,
};
use time::OffsetDateTime;
use tracing::{debug, error, warn};

use crate::archive::{ArchiveReport, AttachmentArchive};
use crate::config_store::{AuditConfigStore, LogKind};
use crate::render::AuditRenderer;
use crate::snapshot::{MessageSnapshot, MessageSnapshotCache, StoreOutcome};

/// One family of audit logs.
#[async_trait]
pub trait LogSection: Command {
    /// The section name used in `log <section>`.
    fn name(&self) -> &'static str;

    /// Handles `log <section> <args...>` sent as `message`.
    async fn handle_command(&self, ctx: &EventContext, message: &Message, args: Args) -> HandlerResult;
}

// ============================================================================
// MessageLog
// ============================================================================

/// Delete and update logging for messages.
#[derive(Debug, Clone)]
pub struct MessageLog {
    config: AuditConfigStore,
    snapshots: MessageSnapshotCache,
    archive: AttachmentArchive,
    renderer: AuditRenderer,
}

impl MessageLog {
    pub fn new(
        config: AuditConfigStore,
        snapshots: MessageSnapshotCache,
        archive: AttachmentArchive,
    ) -> Self {
        Self {
            config,
            snapshots,
            archive,
            renderer: AuditRenderer::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: AuditRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &AuditConfigStore {
        &self.config
    }

    pub fn snapshots(&self) -> &MessageSnapshotCache {
        &self.snapshots
    }

    /// Snapshots a new message, archiving its attachments first.
    pub async fn track(&self, message: &Message) {
        self.record(message, None).await;
    }

    /// Stores the snapshot of `message`, archiving only attachments that
    /// `previous` does not already list.
    async fn record(&self, message: &Message, previous: Option<&MessageSnapshot>) {
        let Some(guild_id) = message.guild_id else {
            return;
        };
        match self.config.is_enabled(guild_id) {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                error!(guild_id = %guild_id, error = %e, "Failed to read audit config");
                return;
            }
        }

        let known = previous.map(MessageSnapshot::attachment_ids).unwrap_or_default();
        let report = self.archive.archive_new(message, &known).await;
        if report != ArchiveReport::default() {
            debug!(
                message_id = %message.id,
                archived = report.archived,
                failed = report.failed,
                "Archived attachments"
            );
        }

        match self.snapshots.store(message) {
            Ok(StoreOutcome::Stored) => {}
            // Disabled between the check and the write.
            Ok(StoreOutcome::Skipped) => debug!(message_id = %message.id, "Snapshot skipped"),
            Err(e) => error!(message_id = %message.id, error = %e, "Failed to store message snapshot"),
        }
    }

    /// Posts an edit to the update log and replaces the snapshot.
    ///
    /// Attachments of the previous snapshot are not downloaded again.
    pub async fn log_update(&self, ctx: &EventContext, message: &Message) {
        let Some(guild_id) = message.guild_id else {
            return;
        };
        let previous = match self.snapshots.fetch(message.id) {
            Ok(previous) => previous,
            Err(e) => {
                error!(message_id = %message.id, error = %e, "Failed to load message snapshot");
                None
            }
        };

        match &previous {
            Some(old) => {
                if let Some(log_channel) = self.log_channel(LogKind::Update, guild_id) {
                    self.post_update(ctx, old, message, guild_id, log_channel).await;
                }
            }
            None => debug!(message_id = %message.id, "No snapshot for edited message"),
        }
        self.record(message, previous.as_ref()).await;
    }

    async fn post_update(
        &self,
        ctx: &EventContext,
        old: &MessageSnapshot,
        message: &Message,
        guild_id: GuildId,
        log_channel: ChannelId,
    ) {
        if old.content == message.content {
            // Embed unfurls and pins arrive as updates too.
            debug!(message_id = %message.id, "Content unchanged, not logging update");
            return;
        }

        let gateway = ctx.gateway();
        let guild = match gateway.get_guild(guild_id).await {
            Ok(guild) => guild,
            Err(e) => {
                error!(guild_id = %guild_id, error = %e, "Failed to get guild for update log");
                return;
            }
        };
        let channel = match gateway.get_channel(message.channel_id).await {
            Ok(channel) => channel,
            Err(e) => {
                error!(channel_id = %message.channel_id, error = %e, "Failed to get channel for update log");
                return;
            }
        };

        let out = self.renderer.render_update(old, message, &channel, &guild);
        if let Err(e) = gateway.send_message(log_channel, out).await {
            error!(message_id = %message.id, error = %e, "Failed to log message update");
        }
    }

    /// Posts a deleted message to the delete log.
    pub async fn log_delete(&self, ctx: &EventContext, deleted: &MessageDelete) {
        let Some(guild_id) = deleted.guild_id else {
            return;
        };
        let Some(log_channel) = self.log_channel(LogKind::Delete, guild_id) else {
            return;
        };

        let snapshot = match self.snapshots.fetch(deleted.id) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!(message_id = %deleted.id, "No snapshot for deleted message");
                return;
            }
            Err(e) => {
                error!(message_id = %deleted.id, error = %e, "Failed to load message snapshot");
                return;
            }
        };
        let Some(author_id) = snapshot.author_id() else {
            warn!(message_id = %deleted.id, "Snapshot has no author");
            return;
        };

        let files = self.archive.retrieve_all(&snapshot).await;

        let gateway = ctx.gateway();
        let author = match gateway.get_user(author_id).await {
            Ok(user) => user,
            Err(e) => {
                error!(user_id = %author_id, error = %e, "Failed to get author for delete log");
                return;
            }
        };
        let guild = match gateway.get_guild(guild_id).await {
            Ok(guild) => guild,
            Err(e) => {
                error!(guild_id = %guild_id, error = %e, "Failed to get guild for delete log");
                return;
            }
        };
        let channel = match gateway.get_channel(deleted.channel_id).await {
            Ok(channel) => channel,
            Err(e) => {
                error!(channel_id = %deleted.channel_id, error = %e, "Failed to get channel for delete log");
                return;
            }
        };

        let out = self.renderer.render_delete(
            &snapshot,
            &author,
            &channel,
            &guild,
            files,
            OffsetDateTime::now_utc(),
        );
        if let Err(e) = gateway.send_message(log_channel, out).await {
            error!(message_id = %deleted.id, error = %e, "Failed to log message delete");
        }
    }

    fn log_channel(&self, kind: LogKind, guild_id: GuildId) -> Option<ChannelId> {
        self.config.log_channel(kind, guild_id).unwrap_or_else(|e| {
            error!(kind = %kind, guild_id = %guild_id, error = %e, "Failed to read log channel");
            None
        })
    }

    async fn reply(&self, ctx: &EventContext, message: &Message, text: String) -> HandlerResult {
        ctx.gateway()
            .send_message(message.channel_id, OutgoingMessage::text(text))
            .await
            .context("Failed to send reply")?;
        Ok(())
    }

    async fn enable(
        &self,
        ctx: &EventContext,
        message: &Message,
        kind: LogKind,
        args: &mut Args,
    ) -> HandlerResult {
        let raw = args.require("channel").context("Failed to extract channel id")?;
        let channel_id = extract_id(&CHANNEL_MENTION, &raw).context("Failed to extract channel id")?;
        let channel = ctx
            .gateway()
            .get_channel(channel_id)
            .await
            .context("Failed to retrieve log channel")?;

        let failed = format!("Failed to enable {kind} logging");
        let guild_id = log_guild(message, &channel).map_err(|e| HandlerError::new(&*failed, e))?;
        self.config
            .enable(kind, guild_id, channel.id)
            .context(failed)?;

        self.reply(ctx, message, format!("Enabled {kind} logs in {}", channel.mention()))
            .await
    }

    async fn disable(
        &self,
        ctx: &EventContext,
        message: &Message,
        kind: LogKind,
        args: &mut Args,
    ) -> HandlerResult {
        let failed = format!("Failed to disable {kind} logging");
        let guild_id = match args.pop() {
            Some(raw) => {
                let channel_id =
                    extract_id(&CHANNEL_MENTION, &raw).context("Failed to extract channel id")?;
                let channel = ctx
                    .gateway()
                    .get_channel(channel_id)
                    .await
                    .context("Failed to retrieve log channel")?;
                log_guild(message, &channel).map_err(|e| HandlerError::new(&*failed, e))?
            }
            None => message
                .guild_id
                .ok_or_else(|| HandlerError::new(&*failed, "not in a guild"))?,
        };

        let was_enabled = self.config.disable(kind, guild_id).context(failed)?;
        let text = if was_enabled {
            format!("Disabled {kind} logs")
        } else {
            format!("{} logs are not enabled", capitalize(kind.as_str()))
        };
        self.reply(ctx, message, text).await
    }
}

/// Resolves the guild whose logs a command configures.
///
/// The channel decides; inside a guild it must belong to that guild.
fn log_guild(message: &Message, channel: &Channel) -> Result<GuildId, String> {
    let Some(guild_id) = channel.guild_id else {
        return Err(format!("channel {} is not in a guild", channel.id));
    };
    match message.guild_id {
        Some(here) if here != guild_id => {
            Err(format!("channel {} belongs to another guild", channel.id))
        }
        _ => Ok(guild_id),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Command for MessageLog {
    fn register(&self, builder: &mut DispatcherBuilder) {
        let gate = || vec![Arc::new(ExcludeBotAuthors) as BoxedMiddleware];

        let log = self.clone();
        builder.register(
            EventKind::MessageCreate,
            gate(),
            handler_fn(move |ctx: Arc<EventContext>| {
                let log = log.clone();
                async move {
                    if let GatewayEvent::MessageCreate(message) = ctx.event() {
                        log.track(message).await;
                    }
                    Ok(())
                }
            }),
        );

        let log = self.clone();
        builder.register(
            EventKind::MessageUpdate,
            gate(),
            handler_fn(move |ctx: Arc<EventContext>| {
                let log = log.clone();
                async move {
                    if let GatewayEvent::MessageUpdate(message) = ctx.event() {
                        log.log_update(&ctx, message).await;
                    }
                    Ok(())
                }
            }),
        );

        let log = self.clone();
        builder.register(
            EventKind::MessageDelete,
            gate(),
            handler_fn(move |ctx: Arc<EventContext>| {
                let log = log.clone();
                async move {
                    if let GatewayEvent::MessageDelete(deleted) = ctx.event() {
                        log.log_delete(&ctx, deleted).await;
                    }
                    Ok(())
                }
            }),
        );
    }
}

#[async_trait]
impl LogSection for MessageLog {
    fn name(&self) -> &'static str {
        "messages"
    }

    async fn handle_command(&self, ctx: &EventContext, message: &Message, mut args: Args) -> HandlerResult {
        let Some(kind) = args.pop().as_deref().and_then(LogKind::parse) else {
            return self
                .reply(
                    ctx,
                    message,
                    "Unknown log type. Available types are: [delete, update]".to_string(),
                )
                .await;
        };

        match args.pop().map(|a| a.to_lowercase()).as_deref() {
            Some("enable") => self.enable(ctx, message, kind, &mut args).await,
            Some("disable") => self.disable(ctx, message, kind, &mut args).await,
            _ => {
                self.reply(
                    ctx,
                    message,
                    "Unknown action. Available actions are: [enable, disable]".to_string(),
                )
                .await
            }
        }
    }
}
