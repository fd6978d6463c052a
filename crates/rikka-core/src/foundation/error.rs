//! Error types for gateway calls.
//!
//! Framework-level errors (handler and dispatch failures) are defined in
//! rikka-framework; storage and audit errors live in their own crates.

use thiserror::Error;

use crate::foundation::ids::Snowflake;

// =============================================================================
// Gateway Errors
// =============================================================================

/// Errors returned by [`Gateway`](crate::Gateway) implementations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The requested entity does not exist or is not visible to the bot.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity, e.g. `"guild"`.
        entity: &'static str,
        /// The id that was looked up.
        id: Snowflake,
    },

    /// The platform refused the call.
    #[error("missing permissions: {0}")]
    Forbidden(String),

    /// The call was rate limited and not retried.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested back-off.
        retry_after_ms: u64,
    },

    /// The connection to the platform failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The platform's response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Creates a not-found error.
    pub fn not_found(entity: &'static str, id: Snowflake) -> Self {
        Self::NotFound { entity, id }
    }

    /// Creates a request error.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = GatewayError::not_found("guild", Snowflake(42));
        assert_eq!(err.to_string(), "guild 42 not found");
    }
}
