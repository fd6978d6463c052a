//! Integration layer - the outbound seam to the chat platform.
//!
//! This module contains:
//! - The [`Gateway`] trait implemented by the embedding chat client
//! - Outbound payload types (messages, embeds, file uploads)

pub mod gateway;

pub use gateway::{
    BoxedGateway, Embed, EmbedField, EmbedFooter, FileUpload, Gateway, OutgoingMessage,
};
