//! # Rikka Store
//!
//! Ordered key spaces over a transactional key/value engine.
//!
//! - **Tuples**: [`Tuple`], an order-preserving encoding of `u64`, string and
//!   byte elements
//! - **Subspaces**: [`Subspace`], a prefix-scoped family of keys
//! - **Directories**: [`Directory`], named collision-free prefix allocation
//! - **Transactions**: [`Database`], running synchronous closures as
//!   serializable transactions with bounded conflict retry
//! - **Engines**: the [`KvEngine`] seam, the in-process [`MemoryEngine`] and,
//!   with the `rocksdb` feature, the durable `RocksEngine`
//!
//! ```rust,ignore
//! let db = Database::in_memory();
//! let dir = Directory::create_or_open(&db, &["app", "logs", "message_track"])?;
//! let flags = dir.subspace(0);
//! db.transact(|txn| {
//!     txn.set(&flags.pack(&Tuple::from(42u64)), &99u64.to_be_bytes());
//!     Ok(())
//! })?;
//! ```

pub mod database;
pub mod directory;
pub mod engine;
pub mod error;
#[cfg(feature = "rocksdb")]
pub mod rocks;
pub mod subspace;
pub mod tuple;

pub use database::{DEFAULT_MAX_ATTEMPTS, Database, ReadTransaction, ReadTxn, Transaction};
pub use directory::Directory;
pub use engine::{CommitRequest, KeyValue, KvEngine, MemoryEngine, Mutation};
pub use error::{StoreError, StoreResult, TupleError, TupleResult};
#[cfg(feature = "rocksdb")]
pub use rocks::{RocksConfig, RocksEngine};
pub use subspace::Subspace;
pub use tuple::{Element, Tuple};
