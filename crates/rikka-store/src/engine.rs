//! The KV engine seam and the in-memory engine.
//!
//! An engine is an ordered byte-key map with multi-version reads and
//! optimistic, read-conflict-checked commits. [`MemoryEngine`] serves tests;
//! deployments persist through `RocksEngine` (feature `rocksdb`) or their own
//! engine behind [`KvEngine`].

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::{Mutex, RwLock};

use crate::error::{StoreError, StoreResult};

/// A key/value pair returned by range reads.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// A buffered write, applied in order at commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Set { key: Vec<u8>, value: Vec<u8> },
    Clear { key: Vec<u8> },
    /// Clears the half-open range `[begin, end)`.
    ClearRange { begin: Vec<u8>, end: Vec<u8> },
}

/// Everything an engine needs to validate and apply a transaction.
#[derive(Debug, Clone, Default)]
pub struct CommitRequest {
    /// The version the transaction read at.
    pub read_version: u64,
    /// Half-open key ranges the transaction read.
    pub read_conflicts: Vec<(Vec<u8>, Vec<u8>)>,
    pub mutations: Vec<Mutation>,
}

/// An ordered, transactional key/value engine.
///
/// Reads happen at a fixed read version. A commit must fail with
/// [`StoreError::Conflict`] if any key inside one of its read-conflict ranges
/// was written after its read version; the [`Database`](crate::Database)
/// runner retries such transactions.
pub trait KvEngine: Send + Sync {
    /// Acquires a read version for a new transaction.
    fn begin(&self) -> u64;

    /// Releases a read version acquired by [`begin`](Self::begin).
    fn release(&self, _read_version: u64) {}

    /// Reads one key as of `read_version`.
    fn get(&self, key: &[u8], read_version: u64) -> StoreResult<Option<Vec<u8>>>;

    /// Reads the half-open range `[begin, end)` as of `read_version`, in key order.
    fn get_range(&self, begin: &[u8], end: &[u8], read_version: u64)
    -> StoreResult<Vec<KeyValue>>;

    /// Validates and applies a transaction, returning its commit version.
    fn commit(&self, request: CommitRequest) -> StoreResult<u64>;
}

// ============================================================================
// In-memory engine
// ============================================================================

#[derive(Debug)]
struct Versioned {
    version: u64,
    /// `None` marks a deletion, kept while a reader might still conflict on it.
    value: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct State {
    version: u64,
    data: BTreeMap<Vec<u8>, Versioned>,
    tombstones: usize,
}

/// An in-process [`KvEngine`].
///
/// Every key keeps only its latest version. A read that finds a key newer
/// than the reader's version fails with [`StoreError::TransactionTooOld`],
/// which the runner treats like a conflict and retries.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: RwLock<State>,
    readers: Mutex<BTreeMap<u64, usize>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live keys.
    pub fn len(&self) -> usize {
        let state = self.state.read();
        state.data.len() - state.tombstones
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the latest committed version.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Drops tombstones no live reader can observe.
    fn purge_tombstones(&self, state: &mut State) {
        if state.tombstones == 0 {
            return;
        }
        let floor = self
            .readers
            .lock()
            .keys()
            .next()
            .copied()
            .unwrap_or(state.version)
            .min(state.version);
        state
            .data
            .retain(|_, v| v.value.is_some() || v.version > floor);
        state.tombstones = state.data.values().filter(|v| v.value.is_none()).count();
    }
}

fn bounds<'a>(begin: &'a [u8], end: &'a [u8]) -> (Bound<&'a [u8]>, Bound<&'a [u8]>) {
    (Bound::Included(begin), Bound::Excluded(end))
}

impl KvEngine for MemoryEngine {
    fn begin(&self) -> u64 {
        // Commits purge under the write lock, so holding the read lock until
        // the reader is registered keeps every tombstone newer than `version`.
        let state = self.state.read();
        let version = state.version;
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
        let state = self.state.read();
        match state.data.get(key) {
            None => Ok(None),
            Some(v) if v.version > read_version => Err(StoreError::TransactionTooOld),
            Some(v) => Ok(v.value.clone()),
        }
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
        let state = self.state.read();
        let mut out = Vec::new();
        for (key, v) in state.data.range::<[u8], _>(bounds(begin, end)) {
            if v.version > read_version {
                return Err(StoreError::TransactionTooOld);
            }
            if let Some(value) = &v.value {
                out.push((key.clone(), value.clone()));
            }
        }
        Ok(out)
    }

    fn commit(&self, request: CommitRequest) -> StoreResult<u64> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        for (begin, end) in &request.read_conflicts {
            if begin >= end {
                continue;
            }
            let conflicted = state
                .data
                .range::<[u8], _>(bounds(begin, end))
                .any(|(_, v)| v.version > request.read_version);
            if conflicted {
                return Err(StoreError::Conflict);
            }
        }

        let version = state.version + 1;
        for mutation in request.mutations {
            match mutation {
                Mutation::Set { key, value } => {
                    let previous = state.data.insert(
                        key,
                        Versioned {
                            version,
                            value: Some(value),
                        },
                    );
                    if previous.is_some_and(|p| p.value.is_none()) {
                        state.tombstones -= 1;
                    }
                }
                Mutation::Clear { key } => {
                    if let Some(v) = state.data.get_mut(&key) {
                        if v.value.take().is_some() {
                            state.tombstones += 1;
                        }
                        v.version = version;
                    }
                }
                Mutation::ClearRange { begin, end } => {
                    if begin >= end {
                        continue;
                    }
                    let mut cleared = 0;
                    for (_, v) in state.data.range_mut::<[u8], _>(bounds(&begin, &end)) {
                        if v.value.take().is_some() {
                            cleared += 1;
                        }
                        v.version = version;
                    }
                    state.tombstones += cleared;
                }
            }
        }
        state.version = version;
        self.purge_tombstones(state);
        Ok(version)
    }
}
