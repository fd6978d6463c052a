//! Configuration module for the Rikka runtime.
//!
//! Layered configuration loading (defaults, `rikka.toml`, environment) and validation
//! for the command surface, logging, audit storage and the database.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_FILE_NAME, ConfigLoader, ENV_PREFIX};
pub use schema::{
    AuditConfig, BotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, RetentionConfig,
    RikkaConfig, SpanEventConfig, StorageConfig,
};
pub use validation::{validate_bucket, validate_config};
