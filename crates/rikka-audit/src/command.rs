//! The `log` command.
//!
//! ```text
//! <prefix>log messages delete enable <#channel>
//! <prefix>log messages delete disable
//! <prefix>log messages update enable <#channel>
//! <prefix>log messages update disable
//! ```
//!
//! Only guild owners (and the bot operator) may run it.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rikka_core::{EventContext, EventKind, GatewayEvent, Message, OutgoingMessage, UserId};
use rikka_framework::{
    BoxedMiddleware, Command, DispatcherBuilder, ExcludeBotAuthors, EventHandler, HandlerResult,
    Middleware, RequireGuildOwner, ResultExt, command,
};

use crate::section::LogSection;

/// Name of the command.
pub const LOG_COMMAND: &str = "log";

/// Lets through only messages invoking a given text command.
pub(crate) struct InvokesCommand {
    prefix: String,
    name: &'static str,
}

impl InvokesCommand {
    pub(crate) fn new(prefix: impl Into<String>, name: &'static str) -> Self {
        Self {
            prefix: prefix.into(),
            name,
        }
    }

    fn matches(&self, msg: &Message) -> bool {
        command::matches(&self.prefix, self.name, msg.guild_id.is_none(), &msg.content)
    }
}

#[async_trait]
impl Middleware for InvokesCommand {
    fn name(&self) -> &'static str {
        "invokes_command"
    }

    async fn process(&self, ctx: Arc<EventContext>) -> Option<Arc<EventContext>> {
        match ctx.event() {
            GatewayEvent::MessageCreate(msg) => {
                if !self.matches(msg) {
                    return None;
                }
            }
            GatewayEvent::MessageUpdate(_)
            | GatewayEvent::MessageDelete(_)
            | GatewayEvent::Ready(_)
            | GatewayEvent::Other { .. } => return None,
        }
        Some(ctx)
    }
}

type Sections = Arc<RwLock<BTreeMap<String, Arc<dyn LogSection>>>>;

/// Routes `log <section> ...` to the named [`LogSection`].
#[derive(Clone)]
pub struct LogCommand {
    prefix: String,
    bot_owner: UserId,
    sections: Sections,
}

impl LogCommand {
    pub fn new(prefix: impl Into<String>, bot_owner: UserId) -> Self {
        Self {
            prefix: prefix.into(),
            bot_owner,
            sections: Arc::default(),
        }
    }

    /// Adds a section, replacing any section of the same name.
    pub fn with_section(self, section: Arc<dyn LogSection>) -> Self {
        self.add_section(section);
        self
    }

    pub fn add_section(&self, section: Arc<dyn LogSection>) {
        self.sections
            .write()
            .insert(section.name().to_string(), section);
    }

    /// Returns the section names in order.
    pub fn section_names(&self) -> Vec<String> {
        self.sections.read().keys().cloned().collect()
    }

    fn section(&self, name: &str) -> Option<Arc<dyn LogSection>> {
        self.sections.read().get(&name.to_lowercase()).cloned()
    }
}

impl Command for LogCommand {
    fn register(&self, builder: &mut DispatcherBuilder) {
        let sections: Vec<_> = self.sections.read().values().cloned().collect();
        for section in sections {
            section.register(builder);
        }

        builder.register(
            EventKind::MessageCreate,
            vec![
                Arc::new(ExcludeBotAuthors) as BoxedMiddleware,
                Arc::new(InvokesCommand::new(&self.prefix, LOG_COMMAND)),
                Arc::new(RequireGuildOwner::new(self.bot_owner)),
            ],
            self.clone(),
        );
    }
}

#[async_trait]
impl EventHandler for LogCommand {
    async fn handle(&self, ctx: Arc<EventContext>) -> HandlerResult {
        let GatewayEvent::MessageCreate(message) = ctx.event() else {
            return Ok(());
        };

        let mut args = command::parse_args(&self.prefix, &message.content);
        let section = args.pop().and_then(|name| self.section(&name));
        match section {
            Some(section) => section.handle_command(&ctx, message, args).await,
            None => {
                let help = format!(
                    "Unknown log section. Available sections are: [{}]",
                    self.section_names().join(", ")
                );
                ctx.gateway()
                    .send_message(message.channel_id, OutgoingMessage::text(help))
                    .await
                    .context("Failed to send reply")?;
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for LogCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogCommand")
            .field("prefix", &self.prefix)
            .field("sections", &self.section_names())
            .finish()
    }
}
