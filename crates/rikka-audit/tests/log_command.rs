mod common;

use common::*;
use rikka_core::{GatewayEvent, Snowflake};

#[tokio::test]
async fn test_owner_enables_delete_logs() {
    let h = Harness::with_memory_blobs().await;

    // The message tracker and the command both run.
    let ran = h.say(OWNER, "r.log messages delete enable <#99>").await;
    assert_eq!(ran, 2);

    assert_eq!(h.config.delete_log_channel(GUILD).unwrap(), Some(LOG));
    assert_eq!(h.gateway.texts_to(CHAT), vec!["Enabled delete logs in <#99>"]);
}

#[tokio::test]
async fn test_enable_accepts_raw_id_and_mixed_case() {
    let h = Harness::with_memory_blobs().await;

    h.say(OWNER, "R.LOG Messages Update Enable 99").await;

    assert_eq!(h.config.update_log_channel(GUILD).unwrap(), Some(LOG));
    assert_eq!(h.gateway.texts_to(CHAT), vec!["Enabled update logs in <#99>"]);
}

#[tokio::test]
async fn test_members_cannot_configure_logs() {
    let h = Harness::with_memory_blobs().await;

    let ran = h.say(MEMBER, "r.log messages delete enable <#99>").await;
    assert_eq!(ran, 1);

    assert!(!h.config.is_enabled(GUILD).unwrap());
    assert!(h.gateway.sent().is_empty());
}

#[tokio::test]
async fn test_disable() {
    let h = Harness::with_memory_blobs().await;
    h.config.enable_delete_log(GUILD, LOG).unwrap();

    h.say(OWNER, "r.log messages delete disable").await;
    h.say(OWNER, "r.log messages delete disable").await;

    assert_eq!(h.config.delete_log_channel(GUILD).unwrap(), None);
    assert_eq!(
        h.gateway.texts_to(CHAT),
        vec!["Disabled delete logs", "Delete logs are not enabled"]
    );
}

#[tokio::test]
async fn test_unknown_channel_is_reported() {
    let h = Harness::with_memory_blobs().await;

    h.say(OWNER, "r.log messages update enable 12345").await;

    assert!(!h.config.is_enabled(GUILD).unwrap());
    assert_eq!(
        h.gateway.texts_to(CHAT),
        vec!["Failed to retrieve log channel: channel 12345 not found"]
    );
}

#[tokio::test]
async fn test_malformed_channel_is_reported() {
    let h = Harness::with_memory_blobs().await;

    h.say(OWNER, "r.log messages update enable #audit").await;
    h.say(OWNER, "r.log messages update enable").await;

    assert_eq!(
        h.gateway.texts_to(CHAT),
        vec![
            "Failed to extract channel id: parse id: invalid id \"#audit\"",
            "Failed to extract channel id: missing channel",
        ]
    );
}

#[tokio::test]
async fn test_help_lines() {
    let h = Harness::with_memory_blobs().await;

    h.say(OWNER, "r.log messages delete toggle").await;
    h.say(OWNER, "r.log messages purge").await;
    h.say(OWNER, "r.log voice").await;

    assert_eq!(
        h.gateway.texts_to(CHAT),
        vec![
            "Unknown action. Available actions are: [enable, disable]",
            "Unknown log type. Available types are: [delete, update]",
            "Unknown log section. Available sections are: [messages]",
        ]
    );
}

#[tokio::test]
async fn test_other_commands_are_ignored() {
    let h = Harness::with_memory_blobs().await;

    h.say(OWNER, "r.logs messages delete enable 99").await;
    h.say(OWNER, "log messages delete enable 99").await;

    assert!(h.gateway.sent().is_empty());
}

#[tokio::test]
async fn test_operator_configures_guild_from_direct_message() {
    let h = Harness::with_memory_blobs().await;

    let mut msg = message(5_000, "log messages update enable 99");
    msg.guild_id = None;
    msg.channel_id = Snowflake(77);
    msg.author = Some(user(OPERATOR));
    h.dispatch(GatewayEvent::MessageCreate(msg)).await;

    assert_eq!(h.config.update_log_channel(GUILD).unwrap(), Some(LOG));
    assert_eq!(
        h.gateway.texts_to(Snowflake(77)),
        vec!["Enabled update logs in <#99>"]
    );
}
