//! Transactions and the retrying transaction runner.
//!
//! Transactions are synchronous closures. Nothing inside a transaction can
//! `.await`, so a transaction is never held open across a network call.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::engine::{CommitRequest, KeyValue, KvEngine, MemoryEngine, Mutation};
use crate::error::{StoreError, StoreResult};

/// Default number of attempts before a conflicting transaction gives up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Read access shared by [`Transaction`] and [`ReadTransaction`].
pub trait ReadTxn {
    /// Reads one key.
    fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Reads the half-open range `[begin, end)` in key order.
    fn get_range(&mut self, begin: &[u8], end: &[u8]) -> StoreResult<Vec<KeyValue>>;
}

// ============================================================================
// Read transaction
// ============================================================================

/// A snapshot read. Records no conflicts and never commits.
pub struct ReadTransaction<'a> {
    engine: &'a dyn KvEngine,
    read_version: u64,
}

impl<'a> ReadTransaction<'a> {
    fn new(engine: &'a dyn KvEngine) -> Self {
        let read_version = engine.begin();
        Self {
            engine,
            read_version,
        }
    }

    pub fn read_version(&self) -> u64 {
        self.read_version
    }
}

impl ReadTxn for ReadTransaction<'_> {
    fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.engine.get(key, self.read_version)
    }

    fn get_range(&mut self, begin: &[u8], end: &[u8]) -> StoreResult<Vec<KeyValue>> {
        self.engine.get_range(begin, end, self.read_version)
    }
}

impl Drop for ReadTransaction<'_> {
    fn drop(&mut self) {
        self.engine.release(self.read_version);
    }
}

// ============================================================================
// Read-write transaction
// ============================================================================

/// A serializable read-write transaction.
///
/// Writes are buffered and visible to later reads of the same transaction.
/// Every read adds a read-conflict range checked at commit.
pub struct Transaction<'a> {
    engine: &'a dyn KvEngine,
    read_version: u64,
    read_conflicts: Vec<(Vec<u8>, Vec<u8>)>,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    cleared: Vec<(Vec<u8>, Vec<u8>)>,
    mutations: Vec<Mutation>,
}

impl<'a> Transaction<'a> {
    fn new(engine: &'a dyn KvEngine) -> Self {
        let read_version = engine.begin();
        Self {
            engine,
            read_version,
            read_conflicts: Vec::new(),
            writes: BTreeMap::new(),
            cleared: Vec::new(),
            mutations: Vec::new(),
        }
    }

    pub fn read_version(&self) -> u64 {
        self.read_version
    }

    /// Buffers a write of `value` at `key`.
    pub fn set(&mut self, key: &[u8], value: &[u8]) {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        self.mutations.push(Mutation::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Buffers a deletion of `key`.
    pub fn clear(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
        self.mutations.push(Mutation::Clear { key: key.to_vec() });
    }

    /// Buffers a deletion of every key in `[begin, end)`.
    pub fn clear_range(&mut self, begin: &[u8], end: &[u8]) {
        if begin >= end {
            return;
        }
        self.writes
            .retain(|k, _| k.as_slice() < begin || k.as_slice() >= end);
        self.cleared.push((begin.to_vec(), end.to_vec()));
        self.mutations.push(Mutation::ClearRange {
            begin: begin.to_vec(),
            end: end.to_vec(),
        });
    }

    fn is_cleared(&self, key: &[u8]) -> bool {
        self.cleared
            .iter()
            .any(|(b, e)| key >= b.as_slice() && key < e.as_slice())
    }

    fn commit(mut self) -> StoreResult<()> {
        if self.mutations.is_empty() {
            return Ok(());
        }
        let request = CommitRequest {
            read_version: self.read_version,
            read_conflicts: std::mem::take(&mut self.read_conflicts),
            mutations: std::mem::take(&mut self.mutations),
        };
        self.engine.commit(request).map(|_| ())
    }
}

impl ReadTxn for Transaction<'_> {
    fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        if let Some(buffered) = self.writes.get(key) {
            return Ok(buffered.clone());
        }
        if self.is_cleared(key) {
            return Ok(None);
        }
        let mut end = key.to_vec();
        end.push(0x00);
        self.read_conflicts.push((key.to_vec(), end));
        self.engine.get(key, self.read_version)
    }

    fn get_range(&mut self, begin: &[u8], end: &[u8]) -> StoreResult<Vec<KeyValue>> {
        if begin >= end {
            return Ok(Vec::new());
        }
        self.read_conflicts.push((begin.to_vec(), end.to_vec()));
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self
            .engine
            .get_range(begin, end, self.read_version)?
            .into_iter()
            .filter(|(k, _)| !self.is_cleared(k))
            .collect();
        for (key, value) in self.writes.range(begin.to_vec()..end.to_vec()) {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.engine.release(self.read_version);
    }
}

// ============================================================================
// Database
// ============================================================================

/// A handle to a transactional KV engine. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    engine: Arc<dyn KvEngine>,
    max_attempts: usize,
}

impl Database {
    /// Creates a database over `engine`.
    pub fn new(engine: Arc<dyn KvEngine>) -> Self {
        Self {
            engine,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Creates a database over a fresh [`MemoryEngine`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryEngine::new()))
    }

    /// Sets how many times a conflicting transaction is attempted.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn engine(&self) -> &Arc<dyn KvEngine> {
        &self.engine
    }

    /// Runs `f` in a read-write transaction and commits it.
    ///
    /// On a conflict the closure is run again against a fresh read version,
    /// so it must not have side effects outside the transaction.
    pub fn transact<T, F>(&self, mut f: F) -> StoreResult<T>
    where
        F: FnMut(&mut Transaction<'_>) -> StoreResult<T>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut txn = Transaction::new(self.engine.as_ref());
            let result = f(&mut txn).and_then(|value| txn.commit().map(|()| value));
            match self.retry_or_return(attempt, result) {
                Some(result) => return result,
                None => continue,
            }
        }
    }

    /// Runs `f` against a consistent snapshot.
    pub fn read_transact<T, F>(&self, mut f: F) -> StoreResult<T>
    where
        F: FnMut(&mut ReadTransaction<'_>) -> StoreResult<T>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut txn = ReadTransaction::new(self.engine.as_ref());
            let result = f(&mut txn);
            drop(txn);
            match self.retry_or_return(attempt, result) {
                Some(result) => return result,
                None => continue,
            }
        }
    }

    /// Returns `None` when the attempt should be retried.
    fn retry_or_return<T>(&self, attempt: usize, result: StoreResult<T>) -> Option<StoreResult<T>> {
        match result {
            Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                debug!(attempt, error = %e, "Retrying transaction");
                None
            }
            Err(e) if e.is_retryable() => Some(Err(StoreError::RetriesExhausted {
                attempts: attempt,
                last: Box::new(e),
            })),
            other => Some(other),
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_your_writes() {
        let db = Database::in_memory();
        let value = db
            .transact(|txn| {
                txn.set(b"a", b"1");
                txn.set(b"b", b"2");
                txn.clear(b"b");
                Ok((txn.get(b"a")?, txn.get(b"b")?))
            })
            .unwrap();
        assert_eq!(value, (Some(b"1".to_vec()), None));
    }

    #[test]
    fn test_range_read_merges_buffered_writes() {
        let db = Database::in_memory();
        db.transact(|txn| {
            txn.set(b"k1", b"old");
            txn.set(b"k2", b"old");
            txn.set(b"k3", b"old");
            Ok(())
        })
        .unwrap();

        let keys = db
            .transact(|txn| {
                txn.clear_range(b"k1", b"k3");
                txn.set(b"k2", b"new");
                txn.get_range(b"k", b"l")
            })
            .unwrap();
        assert_eq!(
            keys,
            vec![
                (b"k2".to_vec(), b"new".to_vec()),
                (b"k3".to_vec(), b"old".to_vec()),
            ]
        );
    }

    #[test]
    fn test_closure_error_discards_writes() {
        let db = Database::in_memory();
        let err = db
            .transact(|txn| {
                txn.set(b"a", b"1");
                Err::<(), _>(StoreError::engine("boom"))
            })
            .unwrap_err();
        assert_eq!(err, StoreError::engine("boom"));

        let value = db.read_transact(|txn| txn.get(b"a")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_conflict_is_retried() {
        let db = Database::in_memory();
        db.transact(|txn| {
            txn.set(b"counter", &0u64.to_be_bytes());
            Ok(())
        })
        .unwrap();

        let mut attempts = 0;
        db.transact(|txn| {
            attempts += 1;
            let current = txn.get(b"counter")?.unwrap_or_default();
            if attempts == 1 {
                // A competing writer commits after our read.
                db.transact(|other| {
                    other.set(b"counter", &5u64.to_be_bytes());
                    Ok(())
                })?;
            }
            let n = u64::from_be_bytes(current.try_into().unwrap_or([0; 8]));
            txn.set(b"counter", &(n + 1).to_be_bytes());
            Ok(())
        })
        .unwrap();

        assert_eq!(attempts, 2);
        let stored = db.read_transact(|txn| txn.get(b"counter")).unwrap().unwrap();
        assert_eq!(stored, 6u64.to_be_bytes().to_vec());
    }

    #[test]
    fn test_retries_are_bounded() {
        let db = Database::in_memory().with_max_attempts(3);
        let mut attempts = 0;
        let err = db
            .transact(|_| {
                attempts += 1;
                Err::<(), _>(StoreError::Conflict)
            })
            .unwrap_err();
        assert_eq!(attempts, 3);
        assert!(matches!(err, StoreError::RetriesExhausted { attempts: 3, .. }));
    }
}
