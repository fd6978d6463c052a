//! Error types for the audit subsystem.

use rikka_core::GatewayError;
use rikka_store::StoreError;
use thiserror::Error;

// =============================================================================
// Blob Errors
// =============================================================================

/// Errors raised by a [`BlobStore`](crate::BlobStore).
#[derive(Debug, Error)]
pub enum BlobError {
    /// The bucket does not exist.
    #[error("bucket {0:?} does not exist")]
    NoSuchBucket(String),

    /// A bucket name or object key was rejected.
    #[error("invalid object key {0:?}")]
    InvalidKey(String),

    /// The backing filesystem failed.
    #[error("blob i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing service failed.
    #[error("blob backend error: {0}")]
    Backend(String),
}

// =============================================================================
// Fetch Errors
// =============================================================================

/// Errors raised while downloading an attachment.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("GET {url} returned {status}")]
    Status {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request could not be completed.
    #[error("GET {url} failed: {message}")]
    Request {
        /// The requested URL.
        url: String,
        /// Transport error message.
        message: String,
    },
}

// =============================================================================
// Audit Errors
// =============================================================================

/// Errors raised by the audit stores and handlers.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A transaction failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A stored value has the wrong shape.
    #[error("corrupt value at {what}: {detail}")]
    CorruptValue {
        /// Which value was being read.
        what: &'static str,
        /// What was wrong with it.
        detail: String,
    },

    /// A snapshot document could not be (de)serialized.
    #[error("snapshot codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Blob storage failed.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// An attachment could not be downloaded.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl AuditError {
    /// Creates a corrupt value error.
    pub fn corrupt(what: &'static str, detail: impl Into<String>) -> Self {
        Self::CorruptValue {
            what,
            detail: detail.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Result type for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;

/// Result type for attachment downloads.
pub type FetchResult<T> = Result<T, FetchError>;
