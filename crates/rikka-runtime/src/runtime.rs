//! Startup provisioning and the event loop.
//!
//! ```rust,ignore
//! use rikka_runtime::RikkaRuntime;
//!
//! // Loads rikka.toml from the current directory and the user config dir.
//! let runtime = RikkaRuntime::builder()
//!     .database(db)
//!     .build()
//!     .await?;
//!
//! // `events` is fed by the gateway client.
//! let stats = runtime.run_until_signal(gateway, events).await;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use rikka_audit::{
    AttachmentArchive, AttachmentFetcher, AuditConfigStore, AuditKeys, BlobStore, FsBlobStore,
    LogCommand, MessageLog, MessageSnapshotCache, RetentionPolicy, SEEN_NAMESPACE, SeenCommand,
    SeenStore,
};
use rikka_core::{BoxedGateway, GatewayEvent, Snowflake};
use rikka_framework::{Command, Dispatcher, DispatcherBuilder};
use rikka_store::Database;
use time::OffsetDateTime;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, RikkaConfig, StorageConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Counters of one [`RikkaRuntime::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Events received from the gateway.
    pub events: usize,
    /// Handlers that ran, successfully or not.
    pub handlers_run: usize,
    /// Dispatch tasks that panicked.
    pub panicked: usize,
}

impl RunStats {
    fn record(&mut self, joined: Result<usize, JoinError>) {
        match joined {
            Ok(ran) => self.handlers_run += ran,
            Err(e) if e.is_panic() => {
                self.panicked += 1;
                error!(error = %e, "Dispatch task panicked");
            }
            Err(_) => {}
        }
    }
}

/// The provisioned bot: a frozen dispatcher plus the audit stores behind it.
pub struct RikkaRuntime {
    config: RikkaConfig,
    dispatcher: Dispatcher,
    audit: AuditConfigStore,
    snapshots: MessageSnapshotCache,
    shutdown: CancellationToken,
}

impl RikkaRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &RikkaConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The per-guild log channel store.
    pub fn audit_config(&self) -> &AuditConfigStore {
        &self.audit
    }

    pub fn snapshots(&self) -> &MessageSnapshotCache {
        &self.snapshots
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Requests shutdown. In-flight dispatches still complete.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Runs one retention pass.
    pub fn prune_now(&self) -> Option<Snowflake> {
        prune(&self.snapshots)
    }

    /// Dispatches every event from `events` until the channel closes or
    /// shutdown is requested.
    ///
    /// Each event is dispatched on its own task, so a slow handler never
    /// delays the next event. Pending dispatches are awaited before returning.
    pub async fn run(
        &self,
        gateway: BoxedGateway,
        mut events: mpsc::Receiver<GatewayEvent>,
    ) -> RunStats {
        let mut stats = RunStats::default();
        let mut tasks: JoinSet<usize> = JoinSet::new();
        let pruner = self.spawn_pruner();

        info!(
            registrations = self.dispatcher.registration_count(),
            prefix = %self.config.bot.prefix,
            "Rikka runtime is running"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("Gateway event stream closed");
                        break;
                    };
                    if let GatewayEvent::Ready(ready) = &event {
                        info!(
                            user = %ready.user.tag(),
                            session = %ready.session_id,
                            guilds = ready.guild_count,
                            "Connected to gateway"
                        );
                    }
                    stats.events += 1;

                    let dispatcher = self.dispatcher.clone();
                    let gateway = Arc::clone(&gateway);
                    tasks.spawn(async move { dispatcher.dispatch(event, gateway).await });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    stats.record(joined);
                }
            }
        }

        if !tasks.is_empty() {
            debug!(pending = tasks.len(), "Waiting for in-flight dispatches");
        }
        while let Some(joined) = tasks.join_next().await {
            stats.record(joined);
        }

        if let Some((token, handle)) = pruner {
            token.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "Prune task failed");
            }
        }

        info!(
            events = stats.events,
            handlers_run = stats.handlers_run,
            "Rikka runtime stopped"
        );
        stats
    }

    /// Like [`run`](Self::run), but also stops on Ctrl+C or SIGTERM.
    pub async fn run_until_signal(
        &self,
        gateway: BoxedGateway,
        events: mpsc::Receiver<GatewayEvent>,
    ) -> RunStats {
        let token = self.shutdown.clone();
        let signals = tokio::spawn(async move {
            wait_for_shutdown().await;
            token.cancel();
        });

        let stats = self.run(gateway, events).await;
        signals.abort();
        stats
    }

    fn spawn_pruner(&self) -> Option<(CancellationToken, JoinHandle<()>)> {
        if self.snapshots.retention() == RetentionPolicy::Forever {
            return None;
        }

        let token = self.shutdown.child_token();
        let stop = token.clone();
        let snapshots = self.snapshots.clone();
        let period = self.config.audit.retention.prune_interval();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = interval.tick() => {
                        prune(&snapshots);
                    }
                }
            }
        });
        Some((token, handle))
    }
}

fn prune(snapshots: &MessageSnapshotCache) -> Option<Snowflake> {
    match snapshots.prune(OffsetDateTime::now_utc()) {
        Ok(cutoff) => cutoff,
        Err(e) => {
            warn!(error = %e, "Failed to prune message snapshots");
            None
        }
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`RikkaRuntime`].
///
/// Services not supplied are built from the configuration: a RocksDB database
/// at `storage.path` (feature `rocksdb`), a filesystem blob store under
/// `audit.blob_root`, and the HTTP attachment fetcher (feature `http-fetch`).
/// Without the feature, the matching service must be supplied or
/// [`build`](Self::build) fails.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<RikkaConfig>,
    init_logging: bool,
    database: Option<Database>,
    blobs: Option<Arc<dyn BlobStore>>,
    fetcher: Option<Arc<dyn AttachmentFetcher>>,
    commands: Vec<Arc<dyn Command>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            config: None,
            init_logging: true,
            database: None,
            blobs: None,
            fetcher: None,
            commands: Vec::new(),
        }
    }

    /// Loads exactly this configuration file.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Searches only `dir` for `rikka.toml`.
    pub fn search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_loader = self.config_loader.search_dir(dir);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Uses `config` as is, skipping file and environment loading.
    pub fn config(mut self, config: RikkaConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Uses `db` instead of opening the configured one.
    pub fn database(mut self, db: Database) -> Self {
        self.database = Some(db);
        self
    }

    pub fn blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn AttachmentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Installs an additional command next to `log`.
    pub fn command(mut self, command: Arc<dyn Command>) -> Self {
        self.commands.push(command);
        self
    }

    /// Loads configuration, provisions storage and freezes the dispatcher.
    pub async fn build(self) -> RuntimeResult<RikkaRuntime> {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => self.config_loader.load()?,
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let db = match self.database {
            Some(db) => db,
            None => open_database(&config.storage)?,
        };
        let blobs = self
            .blobs
            .unwrap_or_else(|| Arc::new(FsBlobStore::new(config.audit.blob_root.clone())));
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => default_fetcher()?,
        };

        let namespace: Vec<&str> = config.audit.namespace.iter().map(String::as_str).collect();
        let keys = AuditKeys::provision(&db, &namespace)
            .map_err(|e| RuntimeError::provision("namespace", e))?;

        let archive = AttachmentArchive::new(blobs, fetcher).with_bucket(&config.audit.bucket);
        archive
            .ensure_bucket()
            .await
            .map_err(|e| RuntimeError::provision("attachment bucket", e))?;

        let seen = if config.bot.seen {
            let store = SeenStore::provision(&db, &SEEN_NAMESPACE)
                .map_err(|e| RuntimeError::provision("seen table", e))?;
            Some(SeenCommand::new(&config.bot.prefix, store))
        } else {
            None
        };

        let audit = AuditConfigStore::new(db.clone(), keys.clone());
        let snapshots = MessageSnapshotCache::new(db, keys, audit.clone())
            .with_retention(config.audit.retention.policy());
        let message_log = MessageLog::new(audit.clone(), snapshots.clone(), archive);
        let log_command = LogCommand::new(&config.bot.prefix, config.bot.owner())
            .with_section(Arc::new(message_log));

        let mut builder = DispatcherBuilder::new();
        builder.install(&log_command);
        if let Some(seen) = &seen {
            builder.install(seen);
        }
        for command in &self.commands {
            builder.install(command.as_ref());
        }
        let dispatcher = builder.build();

        info!(
            namespace = ?config.audit.namespace,
            bucket = %config.audit.bucket,
            retention = ?snapshots.retention(),
            registrations = dispatcher.registration_count(),
            "Runtime provisioned"
        );

        Ok(RikkaRuntime {
            config,
            dispatcher,
            audit,
            snapshots,
            shutdown: CancellationToken::new(),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "rocksdb")]
fn open_database(storage: &StorageConfig) -> RuntimeResult<Database> {
    use rikka_store::{RocksConfig, RocksEngine};

    let config = RocksConfig {
        sync_writes: storage.sync_writes,
        ..RocksConfig::new(&storage.path)
    };
    let engine = RocksEngine::open(config).map_err(|e| RuntimeError::provision("database", e))?;
    Ok(Database::new(Arc::new(engine)))
}

#[cfg(not(feature = "rocksdb"))]
fn open_database(_storage: &StorageConfig) -> RuntimeResult<Database> {
    Err(RuntimeError::MissingDatabase)
}

#[cfg(feature = "http-fetch")]
fn default_fetcher() -> RuntimeResult<Arc<dyn AttachmentFetcher>> {
    let fetcher = rikka_audit::HttpFetcher::new().map_err(RuntimeError::Fetcher)?;
    Ok(Arc::new(fetcher))
}

#[cfg(not(feature = "http-fetch"))]
fn default_fetcher() -> RuntimeResult<Arc<dyn AttachmentFetcher>> {
    Err(RuntimeError::MissingFetcher)
}
