//! Platform data models.
//!
//! These mirror the subset of the platform's REST/gateway objects Rikka
//! actually reads. They are plain serde types so they can be stored as
//! snapshot documents and round-trip losslessly.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::ids::{ChannelId, GuildId, MessageId, Snowflake, UserId};

const CDN_BASE: &str = "https://cdn.discordapp.com";

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Legacy four digit discriminator, `"0"` for migrated accounts.
    #[serde(default = "default_discriminator")]
    pub discriminator: String,
    /// Whether the account is automated.
    #[serde(default)]
    pub bot: bool,
    /// Avatar hash, if the user has one.
    #[serde(default)]
    pub avatar: Option<String>,
}

fn default_discriminator() -> String {
    "0".to_string()
}

impl User {
    /// Returns the mention token for this user, e.g. `<@105484726235607040>`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Returns `name#1234`, or just the name for accounts without a discriminator.
    pub fn tag(&self) -> String {
        match self.discriminator.as_str() {
            "" | "0" => self.username.clone(),
            d => format!("{}#{:0>4}", self.username, d),
        }
    }

    /// Returns the CDN URL of the user's avatar at the given size.
    ///
    /// Animated avatars (hash prefixed with `a_`) resolve to a GIF.
    pub fn avatar_url(&self, size: u16) -> Option<String> {
        self.avatar.as_ref().map(|hash| {
            let ext = if hash.starts_with("a_") { "gif" } else { "png" };
            format!("{CDN_BASE}/avatars/{}/{hash}.{ext}?size={size}", self.id)
        })
    }
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub size: u64,
}

impl Attachment {
    /// Returns the URL to download the attachment from, preferring the proxy.
    pub fn download_url(&self) -> &str {
        self.proxy_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.url)
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    /// Absent for direct messages.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// Absent for some system and webhook-embed messages.
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub edited_timestamp: Option<OffsetDateTime>,
}

impl Message {
    /// Returns the author id, if the message has an author.
    pub fn author_id(&self) -> Option<UserId> {
        self.author.as_ref().map(|a| a.id)
    }

    /// Returns the attachment ids in message order.
    pub fn attachment_ids(&self) -> Vec<Snowflake> {
        self.attachments.iter().map(|a| a.id).collect()
    }
}

/// A guild (server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: GuildId,
    pub name: String,
    pub owner_id: UserId,
    #[serde(default)]
    pub icon: Option<String>,
}

impl Guild {
    /// Returns the CDN URL of the guild icon.
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|hash| format!("{CDN_BASE}/icons/{}/{hash}.png", self.id))
    }
}

/// A channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    /// Absent for direct-message channels.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Channel {
    /// Returns the mention token for this channel, e.g. `<#319588744023769089>`.
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }

    /// Returns `true` for direct-message channels.
    pub fn is_private(&self) -> bool {
        self.guild_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(discriminator: &str, avatar: Option<&str>) -> User {
        User {
            id: Snowflake(105_484_726_235_607_040),
            username: "thy".into(),
            discriminator: discriminator.into(),
            bot: false,
            avatar: avatar.map(Into::into),
        }
    }

    #[test]
    fn test_user_tag() {
        assert_eq!(user("1", None).tag(), "thy#0001");
        assert_eq!(user("0", None).tag(), "thy");
    }

    #[test]
    fn test_user_avatar_url() {
        assert!(user("1", None).avatar_url(1024).is_none());
        let url = user("1", Some("a_abc")).avatar_url(1024).unwrap();
        assert!(url.ends_with("/a_abc.gif?size=1024"));
    }

    #[test]
    fn test_message_json_round_trip() {
        let raw = r#"{
            "id": "644584062064918528",
            "channel_id": "319588744023769089",
            "guild_id": "319567980491046913",
            "author": {"id": "105484726235607040", "username": "thy", "discriminator": "1"},
            "content": "b.stats",
            "attachments": [{"id": "1", "filename": "a.png", "url": "https://x/a.png"}],
            "timestamp": "2019-11-14T17:06:56.189Z"
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.author_id(), Some(Snowflake(105_484_726_235_607_040)));
        assert_eq!(msg.attachment_ids(), vec![Snowflake(1)]);
        assert!(msg.edited_timestamp.is_none());

        let back: Message = serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(back, msg);
    }
}
