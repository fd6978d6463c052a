//! Per-dispatch event context.
//!
//! This module provides [`EventContext`], the value every middleware and
//! handler of one dispatch receives. It pairs the inbound event with the
//! gateway handle used to reply.

use std::fmt;
use std::sync::Arc;

use crate::foundation::event::{EventKind, GatewayEvent};
use crate::foundation::ids::{ChannelId, GuildId};
use crate::foundation::model::Message;
use crate::integration::gateway::BoxedGateway;

/// The context object passed to middleware and handlers.
///
/// A context is created once per inbound event and shared behind an [`Arc`]
/// by all registrations matching the event's kind. It is read-only: a
/// middleware that wants to hand a different context downstream builds a
/// new one with [`with_event`](Self::with_event).
///
/// # Example
///
/// ```rust,ignore
/// async fn handle(ctx: Arc<EventContext>) -> HandlerResult {
///     if let Some(msg) = ctx.message() {
///         ctx.gateway()
///             .send_message(msg.channel_id, OutgoingMessage::text("pong"))
///             .await?;
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct EventContext {
    event: GatewayEvent,
    gateway: BoxedGateway,
}

impl EventContext {
    /// Creates a new context for `event`.
    pub fn new(event: GatewayEvent, gateway: BoxedGateway) -> Self {
        Self { event, gateway }
    }

    /// Returns a context carrying `event` and the same gateway handle.
    pub fn with_event(&self, event: GatewayEvent) -> Self {
        Self {
            event,
            gateway: Arc::clone(&self.gateway),
        }
    }

    /// Returns the wrapped event.
    pub fn event(&self) -> &GatewayEvent {
        &self.event
    }

    /// Returns the routing kind of the wrapped event.
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// Returns the gateway handle for outbound calls.
    pub fn gateway(&self) -> &BoxedGateway {
        &self.gateway
    }

    /// Shorthand for [`GatewayEvent::message`].
    pub fn message(&self) -> Option<&Message> {
        self.event.message()
    }

    /// Shorthand for [`GatewayEvent::channel_id`].
    pub fn channel_id(&self) -> Option<ChannelId> {
        self.event.channel_id()
    }

    /// Shorthand for [`GatewayEvent::guild_id`].
    pub fn guild_id(&self) -> Option<GuildId> {
        self.event.guild_id()
    }
}

impl fmt::Debug for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}
