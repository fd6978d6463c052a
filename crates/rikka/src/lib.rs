//! # Rikka
//!
//! A chat bot that keeps per-guild audit logs of deleted and edited messages.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  mpsc   ┌──────────────┐     ┌────────────────────────────────────┐
//! │ gateway      │────────▶│ RikkaRuntime │────▶│ ExcludeBotAuthors → MessageLog     │──▶ store, blobs
//! │ client       │         │ (task/event) │────▶│ RequireGuildOwner → LogCommand     │──▶ store
//! └──────────────┘         └──────────────┘     └────────────────────────────────────┘
//!        ▲                                                      │
//!        └───────────────────── Gateway trait ──────────────────┘
//! ```
//!
//! - **Core**: identifiers, models, [`GatewayEvent`](rikka_core::GatewayEvent)
//!   and the outbound [`Gateway`](rikka_core::Gateway) trait
//! - **Store**: tuple-encoded key spaces over a transactional engine
//! - **Framework**: middleware, command matching and the dispatcher
//! - **Audit**: the log configuration store, snapshot cache, attachment archive
//!   and renderer, wired up as the `log` command; plus the `seen` command
//! - **Runtime**: configuration, logging, provisioning and the event loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rikka::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // With the `rocksdb` feature the database is opened at `storage.path`.
//!     let runtime = RikkaRuntime::builder().build().await?;
//!
//!     let (events_tx, events) = tokio::sync::mpsc::channel(256);
//!     let gateway: BoxedGateway = my_client::connect(events_tx).await?;
//!
//!     runtime.run_until_signal(gateway, events).await;
//!     Ok(())
//! }
//! ```
//!
//! Guild owners then configure logging from chat:
//!
//! ```text
//! r.log messages delete enable #audit
//! r.log messages update enable 105484726235607040
//! r.log messages update disable
//! r.seen @someone
//! ```
//!
//! ## Features
//!
//! - `http-fetch` *(default)*: download attachments with `reqwest`
//! - `rocksdb`: persist audit state in RocksDB at `storage.path`
//! - `json-log`: JSON log lines

pub use rikka_audit as audit;
pub use rikka_core as core;
pub use rikka_framework as framework;
pub use rikka_runtime as runtime;
pub use rikka_store as store;

/// Prelude module for convenient imports.
pub mod prelude {
    // Runtime - main entry point
    pub use rikka_runtime::{RikkaConfig, RikkaRuntime, RunStats, RuntimeError};

    // Platform seam
    pub use rikka_core::{
        BoxedGateway, ChannelId, Embed, EventContext, FileUpload, Gateway, GatewayError,
        GatewayEvent, GatewayResult, GuildId, Message, MessageId, OutgoingMessage, Snowflake,
        User, UserId,
    };

    // Extending the bot with more commands
    pub use rikka_framework::{
        Args, Command, DispatcherBuilder, EventHandler, HandlerError, HandlerResult,
        ResultExt, handler_fn,
    };
    pub use rikka_framework::{ExcludeBotAuthors, Middleware, RequireBotOwner, RequireGuildOwner};

    // Audit storage seams
    pub use rikka_audit::{AttachmentFetcher, BlobStore, FsBlobStore, MemoryBlobStore};
    pub use rikka_store::{Database, KvEngine};
    #[cfg(feature = "rocksdb")]
    pub use rikka_store::{RocksConfig, RocksEngine};
}
