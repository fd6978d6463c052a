//! Gateway events.
//!
//! Inbound events are a closed sum type: middleware and handlers match on
//! [`GatewayEvent`] exhaustively instead of inspecting an open "any" payload
//! at runtime. Registration is keyed by [`EventKind`], which carries the
//! platform's canonical dispatch names (`MESSAGE_CREATE`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::{ChannelId, GuildId, MessageId};
use super::model::{Message, User};

// ============================================================================
// Event Kind
// ============================================================================

/// Classification of gateway events, used as the dispatcher's routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The session is established.
    Ready,
    /// A message was posted.
    MessageCreate,
    /// A message was edited.
    MessageUpdate,
    /// A message was deleted.
    MessageDelete,
    /// Any dispatch Rikka does not model.
    Other,
}

impl EventKind {
    /// All kinds, in declaration order.
    pub const ALL: [EventKind; 5] = [
        EventKind::Ready,
        EventKind::MessageCreate,
        EventKind::MessageUpdate,
        EventKind::MessageDelete,
        EventKind::Other,
    ];

    /// Returns the platform's dispatch name for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Ready => "READY",
            EventKind::MessageCreate => "MESSAGE_CREATE",
            EventKind::MessageUpdate => "MESSAGE_UPDATE",
            EventKind::MessageDelete => "MESSAGE_DELETE",
            EventKind::Other => "OTHER",
        }
    }

    /// Dense index of this kind, used by the dispatcher's routing table.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "READY" => EventKind::Ready,
            "MESSAGE_CREATE" => EventKind::MessageCreate,
            "MESSAGE_UPDATE" => EventKind::MessageUpdate,
            "MESSAGE_DELETE" => EventKind::MessageDelete,
            _ => EventKind::Other,
        })
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Payload of the `READY` dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ready {
    /// The bot's own account.
    pub user: User,
    pub session_id: String,
    #[serde(default)]
    pub guild_count: usize,
}

/// Payload of the `MESSAGE_DELETE` dispatch.
///
/// Only identifiers survive a delete; the content must be recovered from a
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDelete {
    pub id: MessageId,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
}

// ============================================================================
// Gateway Event
// ============================================================================

/// An inbound gateway event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Ready(Ready),
    MessageCreate(Message),
    /// Carries the message as it is after the edit.
    MessageUpdate(Message),
    MessageDelete(MessageDelete),
    /// An unmodelled dispatch, kept by name for logging.
    Other { name: String },
}

impl GatewayEvent {
    /// Returns the routing kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            GatewayEvent::Ready(_) => EventKind::Ready,
            GatewayEvent::MessageCreate(_) => EventKind::MessageCreate,
            GatewayEvent::MessageUpdate(_) => EventKind::MessageUpdate,
            GatewayEvent::MessageDelete(_) => EventKind::MessageDelete,
            GatewayEvent::Other { .. } => EventKind::Other,
        }
    }

    /// Returns the dispatch name, including the raw name of unmodelled events.
    pub fn name(&self) -> &str {
        match self {
            GatewayEvent::Other { name } => name,
            other => other.kind().as_str(),
        }
    }

    /// Returns the full message for create and update events.
    pub fn message(&self) -> Option<&Message> {
        match self {
            GatewayEvent::MessageCreate(m) | GatewayEvent::MessageUpdate(m) => Some(m),
            GatewayEvent::Ready(_) | GatewayEvent::MessageDelete(_) | GatewayEvent::Other { .. } => {
                None
            }
        }
    }

    /// Returns the channel the event originated in, if any.
    pub fn channel_id(&self) -> Option<ChannelId> {
        match self {
            GatewayEvent::MessageCreate(m) | GatewayEvent::MessageUpdate(m) => Some(m.channel_id),
            GatewayEvent::MessageDelete(d) => Some(d.channel_id),
            GatewayEvent::Ready(_) | GatewayEvent::Other { .. } => None,
        }
    }

    /// Returns the guild the event originated in, if any.
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            GatewayEvent::MessageCreate(m) | GatewayEvent::MessageUpdate(m) => m.guild_id,
            GatewayEvent::MessageDelete(d) => d.guild_id,
            GatewayEvent::Ready(_) | GatewayEvent::Other { .. } => None,
        }
    }
}
