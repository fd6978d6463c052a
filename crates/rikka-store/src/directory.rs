//! The directory layer: named, collision-free prefixes.
//!
//! A directory maps a path such as `["app", "logs", "message_track"]` to a
//! short allocated prefix. Metadata lives under the node prefix `0xFE`:
//!
//! ```text
//! 0xFE ++ pack(path...)   -> allocated prefix
//! 0xFE ++ pack("\0alloc") -> next allocation counter (8-byte big-endian)
//! ```
//!
//! Allocated prefixes are `pack((n,))` for increasing `n`. Packed integers are
//! prefix-free, so no two directories ever overlap.

use tracing::{debug, info};

use crate::database::{Database, ReadTxn, Transaction};
use crate::error::{StoreError, StoreResult};
use crate::subspace::Subspace;
use crate::tuple::Tuple;

const NODE_PREFIX: u8 = 0xFE;
const ALLOC_KEY: &str = "\0alloc";

/// Entry points of the directory layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Directory;

impl Directory {
    /// Opens the directory at `path`, allocating a prefix if it does not
    /// exist yet.
    ///
    /// Idempotent. Concurrent callers converge on the same prefix: the
    /// allocation commits in a single serializable transaction, so a losing
    /// racer retries and then observes the winner's entry.
    pub fn create_or_open(db: &Database, path: &[&str]) -> StoreResult<Subspace> {
        let node = node_key(path)?;
        let prefix = db.transact(|txn| match txn.get(&node)? {
            Some(prefix) => Ok(prefix),
            None => allocate(txn, &node),
        })?;
        debug!(path = ?path, prefix = ?Subspace::from_bytes(prefix.clone()), "Opened directory");
        Ok(Subspace::from_bytes(prefix))
    }

    /// Opens the directory at `path` if it exists.
    pub fn open(db: &Database, path: &[&str]) -> StoreResult<Option<Subspace>> {
        let node = node_key(path)?;
        let prefix = db.read_transact(|txn| txn.get(&node))?;
        Ok(prefix.map(Subspace::from_bytes))
    }

    /// Returns `true` if a directory exists at `path`.
    pub fn exists(db: &Database, path: &[&str]) -> StoreResult<bool> {
        Ok(Self::open(db, path)?.is_some())
    }
}

fn node_key(path: &[&str]) -> StoreResult<Vec<u8>> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath("path is empty".into()));
    }
    if let Some(bad) = path.iter().find(|p| p.is_empty() || p.starts_with('\0')) {
        return Err(StoreError::InvalidPath(format!(
            "invalid path component {bad:?}"
        )));
    }
    let mut key = vec![NODE_PREFIX];
    path.iter()
        .fold(Tuple::new(), |t, p| t.push(*p))
        .pack_into(&mut key);
    Ok(key)
}

fn allocate(txn: &mut Transaction<'_>, node: &[u8]) -> StoreResult<Vec<u8>> {
    let mut counter_key = vec![NODE_PREFIX];
    Tuple::from(ALLOC_KEY).pack_into(&mut counter_key);

    let next = match txn.get(&counter_key)? {
        None => 0,
        Some(raw) => {
            let bytes: [u8; 8] = raw.as_slice().try_into().map_err(|_| {
                StoreError::CorruptMetadata(format!(
                    "allocation counter has {} bytes",
                    raw.len()
                ))
            })?;
            u64::from_be_bytes(bytes)
        }
    };

    let prefix = Tuple::from(next).pack();
    txn.set(&counter_key, &(next + 1).to_be_bytes());
    txn.set(node, &prefix);
    info!(allocation = next, "Allocated directory prefix");
    Ok(prefix)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const PATH: &[&str] = &["app", "logs", "message_track"];

    #[test]
    fn test_create_or_open_is_idempotent() {
        let db = Database::in_memory();
        let first = Directory::create_or_open(&db, PATH).unwrap();
        let second = Directory::create_or_open(&db, PATH).unwrap();
        assert_eq!(first, second);
        assert!(Directory::exists(&db, PATH).unwrap());
    }

    #[test]
    fn test_distinct_paths_are_disjoint() {
        let db = Database::in_memory();
        let a = Directory::create_or_open(&db, PATH).unwrap();
        let b = Directory::create_or_open(&db, &["app", "logs", "other"]).unwrap();
        assert_ne!(a, b);

        let key = a.subspace(2).pack(&Tuple::from(7u64));
        assert!(a.contains(&key));
        assert!(!b.contains(&key));
        let (begin, end) = b.range();
        assert!(key < begin || key >= end);
    }

    #[test]
    fn test_open_missing_directory() {
        let db = Database::in_memory();
        assert!(Directory::open(&db, PATH).unwrap().is_none());
    }

    #[test]
    fn test_rejects_empty_path() {
        let db = Database::in_memory();
        assert!(matches!(
            Directory::create_or_open(&db, &[]),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            Directory::create_or_open(&db, &["app", ""]),
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_converge() {
        let db = Database::in_memory();
        let barrier = Arc::new(tokio::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    Directory::create_or_open(&db, PATH)
                })
            })
            .collect();

        let mut prefixes = Vec::new();
        for handle in handles {
            prefixes.push(handle.await.unwrap().unwrap());
        }
        prefixes.dedup();
        assert_eq!(prefixes.len(), 1);
    }
}
