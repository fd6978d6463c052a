//! Gateway trait and outbound payloads.
//!
//! The gateway connection itself (authentication, reconnects, rate limits)
//! belongs to the embedding application. Rikka only needs the handful of
//! REST-style calls below, so that is all the trait exposes.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::foundation::error::GatewayResult;
use crate::foundation::ids::{ChannelId, GuildId, MessageId, UserId};
use crate::foundation::model::{Channel, Guild, Message, User};

/// Outbound calls to the chat platform.
///
/// Implementations must be cheap to share; the dispatcher hands the same
/// [`BoxedGateway`] to every handler of every event.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Posts a message to a channel and returns the created message.
    async fn send_message(
        &self,
        channel_id: ChannelId,
        message: OutgoingMessage,
    ) -> GatewayResult<Message>;

    /// Replaces the text content of a message the bot authored.
    async fn edit_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        content: String,
    ) -> GatewayResult<Message>;

    /// Looks up a user.
    async fn get_user(&self, user_id: UserId) -> GatewayResult<User>;

    /// Looks up a guild.
    async fn get_guild(&self, guild_id: GuildId) -> GatewayResult<Guild>;

    /// Looks up a channel.
    async fn get_channel(&self, channel_id: ChannelId) -> GatewayResult<Channel>;

    /// Returns the bot's own account.
    async fn current_user(&self) -> GatewayResult<User>;
}

/// Type alias for a shared gateway handle.
pub type BoxedGateway = Arc<dyn Gateway>;

// ============================================================================
// Outbound payloads
// ============================================================================

/// A message to post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
    /// Files uploaded alongside the message. Not serialized; transports send
    /// them as multipart parts.
    #[serde(skip)]
    pub files: Vec<FileUpload>,
}

impl OutgoingMessage {
    /// Creates a plain text message.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Creates a message consisting of a single embed.
    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }

    /// Attaches files to the message.
    pub fn with_files(mut self, files: Vec<FileUpload>) -> Self {
        self.files = files;
        self
    }
}

/// A rich embed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Thumbnail image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub timestamp: Option<OffsetDateTime>,
}

impl Embed {
    /// Creates an embed with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail = url;
        self
    }

    /// Appends a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>, icon_url: Option<String>) -> Self {
        self.footer = Some(EmbedFooter {
            text: text.into(),
            icon_url,
        });
        self
    }

    pub fn timestamp(mut self, at: OffsetDateTime) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// Returns the first field named `name`.
    pub fn get_field(&self, name: &str) -> Option<&EmbedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A name/value pair inside an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// The footer line of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// A file uploaded with a message.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("filename", &self.filename)
            .field("len", &self.data.len())
            .finish()
    }
}
