//! Audit notifications.
//!
//! Both notifications share one layout:
//!
//! | field        | value                          | inline |
//! |--------------|--------------------------------|--------|
//! | User         | `<@id> name#0001 id`           | yes    |
//! | Channel      | `<#id> id`                     | yes    |
//! | Message ID   | `id`                           | no     |
//!
//! followed by the message content fields, with the guild in the footer.

use rikka_core::{Channel, Embed, FileUpload, Guild, Message, OutgoingMessage, User};
use time::OffsetDateTime;

use crate::snapshot::MessageSnapshot;

/// Maximum length of an embed field value, in characters.
pub const FIELD_LIMIT: usize = 1024;

/// Default avatar size requested for thumbnails.
pub const DEFAULT_AVATAR_SIZE: u16 = 1024;

const EMPTY: &str = "*empty*";

/// Builds audit notifications.
#[derive(Debug, Clone, Copy)]
pub struct AuditRenderer {
    avatar_size: u16,
}

impl Default for AuditRenderer {
    fn default() -> Self {
        Self {
            avatar_size: DEFAULT_AVATAR_SIZE,
        }
    }
}

impl AuditRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_avatar_size(mut self, size: u16) -> Self {
        self.avatar_size = size;
        self
    }

    /// Renders the notification for a deleted message.
    ///
    /// `author` is the current account of the snapshot's author; `files` are
    /// the attachments recovered from the archive.
    pub fn render_delete(
        &self,
        snapshot: &MessageSnapshot,
        author: &User,
        channel: &Channel,
        guild: &Guild,
        files: Vec<FileUpload>,
        now: OffsetDateTime,
    ) -> OutgoingMessage {
        let mut embed = self
            .header("Message Deleted", Some(author), snapshot, channel)
            .footer(guild.name.clone(), guild.icon_url())
            .timestamp(now);
        if !snapshot.content.is_empty() {
            embed = embed.field("Deleted content", clamp(&snapshot.content), false);
        }
        OutgoingMessage::embed(embed).with_files(files)
    }

    /// Renders the notification for an edited message.
    pub fn render_update(
        &self,
        snapshot: &MessageSnapshot,
        new_message: &Message,
        channel: &Channel,
        guild: &Guild,
    ) -> OutgoingMessage {
        let author = new_message.author.as_ref().or(snapshot.author.as_ref());
        let edited_at = new_message
            .edited_timestamp
            .unwrap_or(new_message.timestamp);

        let embed = self
            .header("Message Edited", author, new_message, channel)
            .field("Old content", content_or_empty(&snapshot.content), false)
            .field("New content", content_or_empty(&new_message.content), false)
            .footer(guild.name.clone(), guild.icon_url())
            .timestamp(edited_at);
        OutgoingMessage::embed(embed)
    }

    fn header(&self, title: &str, author: Option<&User>, message: &Message, channel: &Channel) -> Embed {
        let user = match author {
            Some(u) => format!("{} {} {}", u.mention(), u.tag(), u.id),
            None => "unknown".to_string(),
        };
        Embed::new(title)
            .thumbnail(author.and_then(|u| u.avatar_url(self.avatar_size)))
            .field("User", user, true)
            .field("Channel", format!("{} {}", channel.mention(), channel.id), true)
            .field("Message ID", message.id.to_string(), false)
    }
}

fn content_or_empty(content: &str) -> String {
    if content.is_empty() {
        EMPTY.to_string()
    } else {
        clamp(content)
    }
}

/// Truncates `value` to [`FIELD_LIMIT`] characters, ending in `…` when cut.
fn clamp(value: &str) -> String {
    if value.chars().count() <= FIELD_LIMIT {
        return value.to_string();
    }
    let mut out: String = value.chars().take(FIELD_LIMIT - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rikka_core::Snowflake;

    fn author() -> User {
        User {
            id: Snowflake(7),
            username: "rikka".into(),
            discriminator: "1".into(),
            bot: false,
            avatar: Some("abc".into()),
        }
    }

    fn guild() -> Guild {
        Guild {
            id: Snowflake(42),
            name: "Takanashi".into(),
            owner_id: Snowflake(7),
            icon: Some("icon".into()),
        }
    }

    fn channel() -> Channel {
        Channel {
            id: Snowflake(55),
            guild_id: Some(Snowflake(42)),
            name: Some("general".into()),
        }
    }

    fn message(content: &str) -> Message {
        Message {
            id: Snowflake(1000),
            channel_id: Snowflake(55),
            guild_id: Some(Snowflake(42)),
            author: Some(author()),
            content: content.into(),
            attachments: vec![],
            timestamp: OffsetDateTime::UNIX_EPOCH,
            edited_timestamp: None,
        }
    }

    #[test]
    fn test_render_delete() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let files = vec![FileUpload::new("a.png", vec![1, 2, 3])];
        let out = AuditRenderer::new().render_delete(
            &message("bye"),
            &author(),
            &channel(),
            &guild(),
            files.clone(),
            now,
        );

        let embed = out.embed.unwrap();
        assert_eq!(embed.title.as_deref(), Some("Message Deleted"));
        assert_eq!(
            embed.thumbnail.as_deref(),
            Some("https://cdn.discordapp.com/avatars/7/abc.png?size=1024")
        );
        let names: Vec<_> = embed.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Channel", "Message ID", "Deleted content"]);
        assert_eq!(embed.fields[0].value, "<@7> rikka#0001 7");
        assert!(embed.fields[0].inline);
        assert_eq!(embed.fields[1].value, "<#55> 55");
        assert_eq!(embed.fields[2].value, "1000");
        assert_eq!(embed.fields[3].value, "bye");
        let footer = embed.footer.unwrap();
        assert_eq!(footer.text, "Takanashi");
        assert_eq!(
            footer.icon_url.as_deref(),
            Some("https://cdn.discordapp.com/icons/42/icon.png")
        );
        assert_eq!(embed.timestamp, Some(now));
        assert_eq!(out.files, files);
    }

    #[test]
    fn test_render_delete_omits_empty_content() {
        let out = AuditRenderer::new().render_delete(
            &message(""),
            &author(),
            &channel(),
            &guild(),
            vec![],
            OffsetDateTime::UNIX_EPOCH,
        );
        assert!(out.embed.unwrap().get_field("Deleted content").is_none());
    }

    #[test]
    fn test_render_update() {
        let edited_at = OffsetDateTime::from_unix_timestamp(1_700_000_100).unwrap();
        let mut new = message("");
        new.edited_timestamp = Some(edited_at);

        let out = AuditRenderer::new().render_update(&message("before"), &new, &channel(), &guild());
        let embed = out.embed.unwrap();

        assert_eq!(embed.title.as_deref(), Some("Message Edited"));
        assert_eq!(embed.get_field("Old content").unwrap().value, "before");
        assert_eq!(embed.get_field("New content").unwrap().value, "*empty*");
        assert_eq!(embed.timestamp, Some(edited_at));
        assert!(out.files.is_empty());
    }

    #[test]
    fn test_clamp() {
        let long = "x".repeat(FIELD_LIMIT + 10);
        let clamped = clamp(&long);
        assert_eq!(clamped.chars().count(), FIELD_LIMIT);
        assert!(clamped.ends_with('…'));

        let exact = "y".repeat(FIELD_LIMIT);
        assert_eq!(clamp(&exact), exact);
    }
}
