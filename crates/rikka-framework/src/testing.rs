//! Test doubles shared by the framework's unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use rikka_core::{
    Channel, ChannelId, Gateway, GatewayError, GatewayEvent, GatewayResult, Guild, GuildId,
    Message, MessageDelete, MessageId, OutgoingMessage, Snowflake, User, UserId,
};
use time::OffsetDateTime;

pub const GUILD: Snowflake = Snowflake(42);
pub const CHANNEL: Snowflake = Snowflake(99);

/// A gateway that records outbound messages and serves canned guilds.
#[derive(Default)]
pub struct MockGateway {
    guilds: HashMap<GuildId, Guild>,
    pub sent: Mutex<Vec<(ChannelId, OutgoingMessage)>>,
}

impl MockGateway {
    pub fn with_guild(mut self, guild: u64, owner: u64) -> Self {
        self.guilds.insert(
            Snowflake(guild),
            Guild {
                id: Snowflake(guild),
                name: "test guild".into(),
                owner_id: Snowflake(owner),
                icon: None,
            },
        );
        self
    }

    pub fn sent_texts(&self) -> Vec<(ChannelId, String)> {
        self.sent
            .lock()
            .iter()
            .map(|(c, m)| (*c, m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn send_message(
        &self,
        channel_id: ChannelId,
        message: OutgoingMessage,
    ) -> GatewayResult<Message> {
        let content = message.content.clone();
        self.sent.lock().push((channel_id, message));
        Ok(Message {
            id: Snowflake(1),
            channel_id,
            guild_id: None,
            author: None,
            content,
            attachments: vec![],
            timestamp: OffsetDateTime::UNIX_EPOCH,
            edited_timestamp: None,
        })
    }

    async fn edit_message(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
        _content: String,
    ) -> GatewayResult<Message> {
        Err(GatewayError::not_found("message", message_id))
    }

    async fn get_user(&self, user_id: UserId) -> GatewayResult<User> {
        Err(GatewayError::not_found("user", user_id))
    }

    async fn get_guild(&self, guild_id: GuildId) -> GatewayResult<Guild> {
        self.guilds
            .get(&guild_id)
            .cloned()
            .ok_or(GatewayError::not_found("guild", guild_id))
    }

    async fn get_channel(&self, channel_id: ChannelId) -> GatewayResult<Channel> {
        Err(GatewayError::not_found("channel", channel_id))
    }

    async fn current_user(&self) -> GatewayResult<User> {
        Ok(user(1, true))
    }
}

pub fn user(id: u64, bot: bool) -> User {
    User {
        id: Snowflake(id),
        username: format!("user{id}"),
        discriminator: "0".into(),
        bot,
        avatar: None,
    }
}

/// A `MESSAGE_CREATE` in channel 99 of guild 42.
pub fn message_event(author: Option<User>, content: &str) -> GatewayEvent {
    GatewayEvent::MessageCreate(Message {
        id: Snowflake(1000),
        channel_id: CHANNEL,
        guild_id: Some(GUILD),
        author,
        content: content.into(),
        attachments: vec![],
        timestamp: OffsetDateTime::UNIX_EPOCH,
        edited_timestamp: None,
    })
}

pub fn delete_event() -> GatewayEvent {
    GatewayEvent::MessageDelete(MessageDelete {
        id: Snowflake(1000),
        channel_id: CHANNEL,
        guild_id: Some(GUILD),
    })
}
