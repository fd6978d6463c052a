//! # Rikka Core
//!
//! The core types of the Rikka bot.
//!
//! This crate provides the building blocks every other Rikka crate speaks in:
//! snowflake identifiers, the message/user/guild/channel models, the closed
//! [`GatewayEvent`] sum type, the per-event [`EventContext`], and the
//! [`Gateway`] trait through which handlers talk back to the chat platform.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Plain data and the event type system:
//! - **Identifiers**: [`Snowflake`] and its typed aliases
//! - **Models**: [`Message`], [`User`], [`Attachment`], [`Guild`], [`Channel`]
//! - **Events**: [`GatewayEvent`], [`EventKind`]
//! - **Context**: [`EventContext`], shared by every handler of one dispatch
//!
//! ### Integration Layer
//!
//! The outbound seam to the chat platform client:
//! - **Gateway**: [`Gateway`] (send/edit messages, metadata lookups)
//! - **Payloads**: [`OutgoingMessage`], [`Embed`], [`FileUpload`]
//!
//! ## Event Flow
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌──────────────────────┐
//! │   Gateway   │────▶│ Dispatcher │────▶│ middleware → handler │
//! │   client    │     │            │────▶│ middleware → handler │
//! └─────────────┘     └────────────┘     └──────────────────────┘
//!        ▲                                          │
//!        └────────────── Gateway trait ─────────────┘
//! ```

pub mod foundation;
pub mod integration;

pub use foundation::{
    Attachment, Channel, ChannelId, EventContext, EventKind, GatewayError, GatewayEvent,
    GatewayResult, Guild, GuildId, Message, MessageDelete, MessageId, Ready, Snowflake, User,
    UserId,
};
pub use integration::{
    BoxedGateway, Embed, EmbedField, EmbedFooter, FileUpload, Gateway, OutgoingMessage,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::*;
}
