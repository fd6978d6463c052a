//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use rikka_audit::{DEFAULT_BUCKET, DEFAULT_NAMESPACE, RetentionPolicy};
use rikka_core::{Snowflake, UserId};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// ```toml
/// [bot]
/// prefix = "r."
/// owner_id = 105484726235607040
/// seen = true
///
/// [logging]
/// level = "debug"
///
/// [audit]
/// bucket = "message-attachments"
/// blob_root = "/var/lib/rikka/blobs"
///
/// [audit.retention]
/// max_age_days = 90
///
/// [storage]
/// path = "/var/lib/rikka/db"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RikkaConfig {
    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Command surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Prefix of text commands.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Account id of the bot's operator. Zero means nobody.
    #[serde(default)]
    pub owner_id: u64,

    /// Install the `seen` command and its tracker.
    #[serde(default = "default_seen")]
    pub seen: bool,
}

impl BotConfig {
    pub fn owner(&self) -> UserId {
        Snowflake(self.owner_id)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            owner_id: 0,
            seen: default_seen(),
        }
    }
}

fn default_prefix() -> String {
    "r.".to_string()
}

fn default_seen() -> bool {
    true
}

// =============================================================================
// Audit
// =============================================================================

/// Audit log storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Directory path of the message-tracking namespace.
    #[serde(default = "default_namespace")]
    pub namespace: Vec<String>,

    /// Blob bucket for archived attachments.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Root directory of the filesystem blob store.
    #[serde(default = "default_blob_root")]
    pub blob_root: PathBuf,

    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            bucket: default_bucket(),
            blob_root: default_blob_root(),
            retention: RetentionConfig::default(),
        }
    }
}

fn default_namespace() -> Vec<String> {
    DEFAULT_NAMESPACE.iter().map(|s| s.to_string()).collect()
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_blob_root() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("rikka").join("blobs"))
        .unwrap_or_else(|| PathBuf::from("data/blobs"))
}

/// Snapshot retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Age in days after which snapshots are pruned. Unset keeps them forever.
    #[serde(default)]
    pub max_age_days: Option<u64>,

    /// Seconds between prune passes.
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: None,
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

impl RetentionConfig {
    pub fn policy(&self) -> RetentionPolicy {
        match self.max_age_days {
            Some(days) => RetentionPolicy::MaxAge(Duration::from_secs(days.saturating_mul(86_400))),
            None => RetentionPolicy::Forever,
        }
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }
}

fn default_prune_interval_secs() -> u64 {
    3600
}

// =============================================================================
// Storage
// =============================================================================

/// Durable key/value storage settings.
///
/// Used only when the `rocksdb` feature is enabled and no database is handed
/// to the runtime builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// RocksDB directory.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Sync the write-ahead log on every commit.
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            sync_writes: default_sync_writes(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("rikka").join("db"))
        .unwrap_or_else(|| PathBuf::from("data/db"))
}

fn default_sync_writes() -> bool {
    true
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to compact without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of the call site.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-module level overrides, e.g. `rikka_store = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}
