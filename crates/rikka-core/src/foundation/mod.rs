//! Foundation layer - identifiers, models and the event type system.
//!
//! This module contains the plain data the rest of Rikka is built from:
//! - Snowflake identifiers
//! - Message, user, guild and channel models
//! - The closed gateway event sum type
//! - The per-dispatch event context

pub mod context;
pub mod error;
pub mod event;
pub mod ids;
pub mod model;

pub use context::EventContext;
pub use error::{GatewayError, GatewayResult};
pub use event::{EventKind, GatewayEvent, MessageDelete, Ready};
pub use ids::{ChannelId, GuildId, MessageId, Snowflake, UserId};
pub use model::{Attachment, Channel, Guild, Message, User};
