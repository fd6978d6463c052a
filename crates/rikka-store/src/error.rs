//! Error types for the store.

use thiserror::Error;

// =============================================================================
// Tuple Errors
// =============================================================================

/// Errors raised while decoding packed tuples.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TupleError {
    /// A type code this codec does not understand.
    #[error("unknown tuple type code 0x{code:02x} at offset {offset}")]
    UnknownTypeCode {
        /// The offending byte.
        code: u8,
        /// Position in the input.
        offset: usize,
    },

    /// The input ended in the middle of an element.
    #[error("truncated tuple element at offset {offset}")]
    Truncated {
        /// Start of the incomplete element.
        offset: usize,
    },

    /// A string element is not valid UTF-8.
    #[error("invalid utf-8 in string element at offset {offset}")]
    InvalidUtf8 {
        /// Start of the string element.
        offset: usize,
    },

    /// The key does not start with the subspace prefix.
    #[error("key is outside of subspace")]
    NotInSubspace,
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors raised by transactions and the directory layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Another transaction committed a write to a key this one read.
    #[error("transaction conflicted with a concurrent commit")]
    Conflict,

    /// A read hit a key newer than the transaction's read version.
    #[error("transaction read version is too old")]
    TransactionTooOld,

    /// Retries were exhausted.
    #[error("transaction did not commit after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// The error of the final attempt.
        last: Box<StoreError>,
    },

    /// Stored bytes could not be decoded as a tuple.
    #[error(transparent)]
    Tuple(#[from] TupleError),

    /// A directory path was rejected.
    #[error("invalid directory path: {0}")]
    InvalidPath(String),

    /// Directory metadata is malformed.
    #[error("corrupt directory metadata: {0}")]
    CorruptMetadata(String),

    /// The engine failed.
    #[error("storage engine error: {0}")]
    Engine(String),
}

impl StoreError {
    /// Creates an engine error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Returns `true` if running the transaction again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict | Self::TransactionTooOld)
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for tuple decoding.
pub type TupleResult<T> = Result<T, TupleError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
