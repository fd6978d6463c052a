//! Runtime error types.

use rikka_audit::{AuditError, FetchError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while starting the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The database, a store namespace or the blob bucket could not be created.
    #[error("Failed to provision {what}: {source}")]
    Provision {
        what: &'static str,
        #[source]
        source: AuditError,
    },

    /// The attachment fetcher could not be built.
    #[error("Failed to build attachment fetcher: {0}")]
    Fetcher(#[source] FetchError),

    /// No database was supplied and the `rocksdb` feature is disabled.
    #[error("No database configured and the rocksdb feature is disabled")]
    MissingDatabase,

    /// No fetcher was supplied and HTTP fetching is compiled out.
    #[error("No attachment fetcher configured and the http-fetch feature is disabled")]
    MissingFetcher,
}

impl RuntimeError {
    /// Creates a provisioning error for the named resource.
    pub fn provision(what: &'static str, source: impl Into<AuditError>) -> Self {
        Self::Provision {
            what,
            source: source.into(),
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
