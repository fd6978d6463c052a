//! Middleware: filters in front of handlers.
//!
//! A [`Middleware`] looks at an event and either passes the context on or
//! suppresses the event by returning `None`. Every implementation matches the
//! closed [`GatewayEvent`] type explicitly and lets through the variants it
//! does not gate.
//!
//! Three capability checks are provided:
//!
//! | middleware            | gates               | passes when                            |
//! |-----------------------|---------------------|----------------------------------------|
//! | [`ExcludeBotAuthors`] | create, update      | the author is present and not a bot    |
//! | [`RequireBotOwner`]   | create, update      | the author is the configured operator  |
//! | [`RequireGuildOwner`] | create, update      | the author owns the guild, or operates the bot |

use std::sync::Arc;

use async_trait::async_trait;
use rikka_core::{EventContext, GatewayEvent, Message, UserId};
use tracing::{debug, warn};

/// A filter deciding whether an event reaches its handler.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns the context to pass downstream, or `None` to suppress the event.
    async fn process(&self, ctx: Arc<EventContext>) -> Option<Arc<EventContext>>;
}

/// A type-erased, shareable middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

// ============================================================================
// ExcludeBotAuthors
// ============================================================================

/// Suppresses messages written by automated accounts.
///
/// A message without an author (webhook embeds, some system messages) counts
/// as automated. Deletes carry no author and always pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcludeBotAuthors;

fn is_bot_message(msg: &Message) -> bool {
    msg.author.as_ref().is_none_or(|a| a.bot)
}

#[async_trait]
impl Middleware for ExcludeBotAuthors {
    fn name(&self) -> &'static str {
        "exclude_bot_authors"
    }

    async fn process(&self, ctx: Arc<EventContext>) -> Option<Arc<EventContext>> {
        match ctx.event() {
            GatewayEvent::MessageCreate(msg) | GatewayEvent::MessageUpdate(msg) => {
                if is_bot_message(msg) {
                    return None;
                }
            }
            GatewayEvent::MessageDelete(_) | GatewayEvent::Ready(_) | GatewayEvent::Other { .. } => {}
        }
        Some(ctx)
    }
}

// ============================================================================
// RequireBotOwner
// ============================================================================

/// Lets through only messages written by the bot's operator.
#[derive(Debug, Clone, Copy)]
pub struct RequireBotOwner {
    owner_id: UserId,
}

impl RequireBotOwner {
    pub fn new(owner_id: UserId) -> Self {
        Self { owner_id }
    }
}

#[async_trait]
impl Middleware for RequireBotOwner {
    fn name(&self) -> &'static str {
        "require_bot_owner"
    }

    async fn process(&self, ctx: Arc<EventContext>) -> Option<Arc<EventContext>> {
        match ctx.event() {
            GatewayEvent::MessageCreate(msg) | GatewayEvent::MessageUpdate(msg) => {
                if msg.author_id() != Some(self.owner_id) {
                    return None;
                }
            }
            GatewayEvent::MessageDelete(_) | GatewayEvent::Ready(_) | GatewayEvent::Other { .. } => {}
        }
        Some(ctx)
    }
}

// ============================================================================
// RequireGuildOwner
// ============================================================================

/// Lets through only messages written by the owner of the guild they were
/// posted in, or by the bot's operator.
///
/// Ownership is checked with a live guild lookup. A failed lookup suppresses
/// the event.
#[derive(Debug, Clone, Copy)]
pub struct RequireGuildOwner {
    bot_owner: UserId,
}

impl RequireGuildOwner {
    pub fn new(bot_owner: UserId) -> Self {
        Self { bot_owner }
    }

    async fn is_guild_owner(&self, ctx: &EventContext, msg: &Message) -> bool {
        let Some(author) = msg.author_id() else {
            return false;
        };
        if author == self.bot_owner {
            return true;
        }
        let Some(guild_id) = msg.guild_id else {
            debug!(message_id = %msg.id, "Message outside of a guild, not a guild owner");
            return false;
        };
        match ctx.gateway().get_guild(guild_id).await {
            Ok(guild) => guild.owner_id == author,
            Err(e) => {
                warn!(guild_id = %guild_id, error = %e, "Guild lookup failed, suppressing event");
                false
            }
        }
    }
}

#[async_trait]
impl Middleware for RequireGuildOwner {
    fn name(&self) -> &'static str {
        "require_guild_owner"
    }

    async fn process(&self, ctx: Arc<EventContext>) -> Option<Arc<EventContext>> {
        match ctx.event() {
            GatewayEvent::MessageCreate(msg) | GatewayEvent::MessageUpdate(msg) => {
                if !self.is_guild_owner(&ctx, msg).await {
                    return None;
                }
            }
            GatewayEvent::MessageDelete(_) | GatewayEvent::Ready(_) | GatewayEvent::Other { .. } => {}
        }
        Some(ctx)
    }
}
