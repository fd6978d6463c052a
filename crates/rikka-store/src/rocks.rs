//! A durable [`KvEngine`] on RocksDB.
//!
//! RocksDB holds the latest value of every key. Conflict detection also needs
//! the version of recent writes, which is kept in memory beside it: a key
//! written at version `v` is remembered until no reader at or below `v` is
//! left. Versions restart at zero on open; a transaction never outlives the
//! process, so nothing read before a restart can commit after it.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use rocksdb::{DB, DBCompressionType, Direction, IteratorMode, Options, WriteBatch, WriteOptions};
use tracing::info;

use crate::engine::{CommitRequest, KeyValue, KvEngine, Mutation};
use crate::error::{StoreError, StoreResult};

/// Settings of a [`RocksEngine`].
#[derive(Debug, Clone)]
pub struct RocksConfig {
    /// Database directory, created if missing.
    pub path: PathBuf,
    /// Sync the write-ahead log on every commit.
    pub sync_writes: bool,
    /// Memtable size in bytes.
    pub write_buffer_size: usize,
}

impl RocksConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sync_writes: true,
            write_buffer_size: 64 * 1024 * 1024,
        }
    }

    /// Small buffers and no fsync.
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            sync_writes: false,
            write_buffer_size: 4 * 1024 * 1024,
            ..Self::new(path)
        }
    }
}

#[derive(Debug, Default)]
struct Versions {
    version: u64,
    /// Write version of every key written after the oldest live reader began.
    recent: BTreeMap<Vec<u8>, u64>,
}

impl Versions {
    fn newer_than(&self, begin: &[u8], end: &[u8], read_version: u64) -> bool {
        self.recent
            .range::<[u8], _>((Bound::Included(begin), Bound::Excluded(end)))
            .any(|(_, v)| *v > read_version)
    }
}

/// A [`KvEngine`] persisting to a RocksDB directory.
pub struct RocksEngine {
    db: DB,
    path: PathBuf,
    sync_writes: bool,
    versions: RwLock<Versions>,
    readers: Mutex<BTreeMap<u64, usize>>,
}

fn rocks_err(action: &str) -> impl FnOnce(rocksdb::Error) -> StoreError + '_ {
    move |e| StoreError::engine(format!("RocksDB {action} failed: {e}"))
}

impl RocksEngine {
    /// Opens or creates the database described by `config`.
    pub fn open(config: RocksConfig) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(DBCompressionType::Snappy);

        let db = DB::open(&opts, &config.path).map_err(|e| {
            StoreError::engine(format!(
                "failed to open RocksDB at {}: {e}",
                config.path.display()
            ))
        })?;
        info!(path = %config.path.display(), sync = config.sync_writes, "Opened RocksDB engine");

        Ok(Self {
            db,
            path: config.path,
            sync_writes: config.sync_writes,
            versions: RwLock::default(),
            readers: Mutex::default(),
        })
    }

    /// Opens `path` with default settings.
    pub fn open_default(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open(RocksConfig::new(path.as_ref()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Forgets write versions no live reader can conflict with.
    fn forget_settled(&self, versions: &mut Versions) {
        let floor = self
            .readers
            .lock()
            .keys()
            .next()
            .copied()
            .unwrap_or(versions.version)
            .min(versions.version);
        versions.recent.retain(|_, v| *v > floor);
    }

    fn scan(&self, begin: &[u8], end: &[u8]) -> StoreResult<Vec<KeyValue>> {
        let mut out = Vec::new();
        for item in self.db.iterator(IteratorMode::From(begin, Direction::Forward)) {
            let (key, value) = item.map_err(rocks_err("scan"))?;
            if &*key >= end {
                break;
            }
            out.push((key.into_vec(), value.into_vec()));
        }
        Ok(out)
    }
}

impl KvEngine for RocksEngine {
    fn begin(&self) -> u64 {
        let versions = self.versions.read();
        let version = versions.version;
        *self.readers.lock().entry(version).or_insert(0) += 1;
        version
    }

    fn release(&self, read_version: u64) {
        let mut readers = self.readers.lock();
        if let Some(count) = readers.get_mut(&read_version) {
            *count -= 1;
            if *count == 0 {
                readers.remove(&read_version);
            }
        }
    }

    fn get(&self, key: &[u8], read_version: u64) -> StoreResult<Option<Vec<u8>>> {
        let versions = self.versions.read();
        if versions.recent.get(key).is_some_and(|v| *v > read_version) {
            return Err(StoreError::TransactionTooOld);
        }
        self.db.get(key).map_err(rocks_err("get"))
    }

    fn get_range(
        &self,
        begin: &[u8],
        end: &[u8],
        read_version: u64,
    ) -> StoreResult<Vec<KeyValue>> {
        if begin >= end {
            return Ok(Vec::new());
        }
        let versions = self.versions.read();
        if versions.newer_than(begin, end, read_version) {
            return Err(StoreError::TransactionTooOld);
        }
        self.scan(begin, end)
    }

    fn commit(&self, request: CommitRequest) -> StoreResult<u64> {
        let mut versions = self.versions.write();

        for (begin, end) in &request.read_conflicts {
            if begin < end && versions.newer_than(begin, end, request.read_version) {
                return Err(StoreError::Conflict);
            }
        }

        let mut batch = WriteBatch::default();
        let mut touched = Vec::with_capacity(request.mutations.len());
        for mutation in request.mutations {
            match mutation {
                Mutation::Set { key, value } => {
                    batch.put(&key, &value);
                    touched.push(key);
                }
                Mutation::Clear { key } => {
                    batch.delete(&key);
                    touched.push(key);
                }
                Mutation::ClearRange { begin, end } => {
                    if begin >= end {
                        continue;
                    }
                    // Readers of the range must see every removed key as written.
                    touched.extend(self.scan(&begin, &end)?.into_iter().map(|(k, _)| k));
                    batch.delete_range(&begin, &end);
                }
            }
        }

        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        self.db.write_opt(batch, &opts).map_err(rocks_err("commit"))?;

        let version = versions.version + 1;
        for key in touched {
            versions.recent.insert(key, version);
        }
        versions.version = version;
        self.forget_settled(&mut versions);
        Ok(version)
    }
}

impl std::fmt::Debug for RocksEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksEngine")
            .field("path", &self.path)
            .field("version", &self.versions.read().version)
            .finish_non_exhaustive()
    }
}
