//! Rikka Runtime - configuration, logging and the event loop of the Rikka bot.
//!
//! This crate provides:
//! - Layered configuration (`rikka.toml`, `RIKKA_*` environment)
//! - Logging setup over `tracing-subscriber`
//! - Startup provisioning of the database, audit namespace and attachment
//!   bucket
//! - [`RikkaRuntime`], which feeds gateway events to the dispatcher until
//!   shutdown
//!
//! ```ignore
//! use rikka_runtime::RikkaRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = RikkaRuntime::builder().build().await?;
//!
//!     let (tx, rx) = tokio::sync::mpsc::channel(256);
//!     let gateway = my_gateway_client::connect(tx).await?;
//!
//!     runtime.run_until_signal(gateway, rx).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    AuditConfig, BotConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig,
    RetentionConfig, RikkaConfig, StorageConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RikkaRuntime, RunStats, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
