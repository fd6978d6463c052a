mod common;

use std::sync::Arc;

use common::*;
use rikka_audit::{SEEN_NAMESPACE, SeenCommand, SeenStore};
use rikka_core::{GatewayEvent, OutgoingMessage, Snowflake};
use rikka_framework::{Dispatcher, DispatcherBuilder};
use rikka_store::Database;
use time::OffsetDateTime;
use time::macros::datetime;

struct SeenHarness {
    store: SeenStore,
    gateway: Arc<RecordingGateway>,
    dispatcher: Dispatcher,
}

impl SeenHarness {
    fn new() -> Self {
        let db = Database::in_memory();
        let store = SeenStore::provision(&db, &SEEN_NAMESPACE).unwrap();
        let mut builder = DispatcherBuilder::new();
        builder.install(&SeenCommand::new(PREFIX, store.clone()));
        Self {
            store,
            gateway: Arc::new(RecordingGateway::standard()),
            dispatcher: builder.build(),
        }
    }

    async fn say(&self, author: Snowflake, content: &str) -> usize {
        let mut msg = message(5_000, content);
        msg.author = Some(user(author));
        self.dispatcher
            .dispatch(GatewayEvent::MessageCreate(msg), self.gateway.clone())
            .await
    }

    fn field(reply: &OutgoingMessage, name: &str) -> String {
        let embed = reply.embed.as_ref().expect("embed reply");
        embed.get_field(name).expect("field").value.clone()
    }
}

#[tokio::test]
async fn test_messages_stamp_channel_and_guild() {
    let h = SeenHarness::new();
    let before = OffsetDateTime::now_utc();

    let ran = h.say(MEMBER, "hello").await;
    assert_eq!(ran, 1);

    let seen = h.store.last_seen(MEMBER, CHAT, Some(GUILD)).unwrap();
    let channel = seen.channel.unwrap();
    assert!(channel >= before);
    assert_eq!(seen.guild, Some(channel));
    assert!(h.gateway.sent().is_empty());
}

#[tokio::test]
async fn test_seen_other_user() {
    let h = SeenHarness::new();
    h.store
        .record(MEMBER, CHAT, Some(GUILD), datetime!(2000-01-01 0:00 UTC))
        .unwrap();

    let ran = h.say(OWNER, "r.seen <@8>").await;
    assert_eq!(ran, 2);

    let replies = h.gateway.sent_to(CHAT);
    assert_eq!(replies.len(), 1);
    let embed = replies[0].embed.as_ref().unwrap();
    assert_eq!(embed.title.as_deref(), Some("Last seen"));
    assert_eq!(embed.thumbnail, user(MEMBER).avatar_url(1024));
    assert_eq!(embed.footer.as_ref().map(|f| f.text.as_str()), Some("Rikka"));
    assert!(SeenHarness::field(&replies[0], "Channel").ends_with("years ago"));
    assert!(SeenHarness::field(&replies[0], "Guild").ends_with("years ago"));
}

#[tokio::test]
async fn test_unseen_user_renders_never() {
    let h = SeenHarness::new();

    h.say(OWNER, "r.seen 8").await;

    let replies = h.gateway.sent_to(CHAT);
    assert_eq!(SeenHarness::field(&replies[0], "Channel"), "never");
    assert_eq!(SeenHarness::field(&replies[0], "Guild"), "never");
}

#[tokio::test]
async fn test_guild_time_spans_channels() {
    let h = SeenHarness::new();
    let at = datetime!(2000-01-01 0:00 UTC);
    h.store.record(MEMBER, LOG, Some(GUILD), at).unwrap();

    h.say(OWNER, "r.seen 8").await;

    let replies = h.gateway.sent_to(CHAT);
    assert_eq!(SeenHarness::field(&replies[0], "Channel"), "never");
    assert!(SeenHarness::field(&replies[0], "Guild").ends_with("years ago"));
}

#[tokio::test]
async fn test_too_many_users() {
    let h = SeenHarness::new();

    h.say(OWNER, "r.seen 7 8").await;

    assert_eq!(h.gateway.texts_to(CHAT), vec!["Please only supply one user"]);
}

#[tokio::test]
async fn test_bad_user_id_is_reported() {
    let h = SeenHarness::new();

    h.say(OWNER, "r.seen someone").await;
    h.say(OWNER, "r.seen 12345").await;

    assert_eq!(
        h.gateway.texts_to(CHAT),
        vec![
            "Failed to parse user id: parse id: invalid id \"someone\"",
            "Failed to find user: user 12345 not found",
        ]
    );
}

#[tokio::test]
async fn test_bots_are_not_tracked() {
    let h = SeenHarness::new();
    let mut msg = message(5_001, "beep");
    let mut bot = user(Snowflake(2));
    bot.bot = true;
    msg.author = Some(bot);

    let ran = h
        .dispatcher
        .dispatch(GatewayEvent::MessageCreate(msg), h.gateway.clone())
        .await;

    assert_eq!(ran, 0);
    let seen = h.store.last_seen(Snowflake(2), CHAT, Some(GUILD)).unwrap();
    assert_eq!(seen.channel, None);
}
