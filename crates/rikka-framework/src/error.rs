//! Error types for the Rikka framework.

use thiserror::Error;
use tower::BoxError;

/// Returned by a middleware layer when an event is suppressed.
///
/// The dispatcher recognises this error and silently skips the registration
/// without logging anything. All other errors are treated as genuine failures.
#[derive(Debug, Clone, Error)]
#[error("event skipped by filter")]
pub struct EventSkipped;

/// A failed handler, carrying the context line shown to the invoker.
///
/// Displays as `"{context}: {source}"`, which is exactly the notice the
/// dispatcher posts back to the originating channel.
#[derive(Debug, Error)]
#[error("{context}: {source}")]
pub struct HandlerError {
    /// What the handler was doing, e.g. `"Error enabling delete logs"`.
    pub context: String,
    /// The underlying failure.
    pub source: BoxError,
}

impl HandlerError {
    /// Creates a handler error from a context line and a cause.
    pub fn new(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Attaches a context line to a fallible result.
pub trait ResultExt<T> {
    /// Wraps the error in a [`HandlerError`] with `context`.
    fn context(self, context: impl Into<String>) -> Result<T, HandlerError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<BoxError>,
{
    fn context(self, context: impl Into<String>) -> Result<T, HandlerError> {
        self.map_err(|e| HandlerError::new(context, e))
    }
}

/// Errors raised while interpreting command arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgsError {
    /// A required argument was not supplied.
    #[error("missing {0}")]
    Missing(&'static str),

    /// An argument that should be an id or mention is neither.
    #[error("parse id: invalid id {value:?}")]
    InvalidId {
        /// The raw argument.
        value: String,
    },
}

/// Result type for handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Result type for argument parsing.
pub type ArgsResult<T> = Result<T, ArgsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_display() {
        let err: Result<(), _> = Err(ArgsError::Missing("channel"));
        let err = err.context("Error enabling delete logs").unwrap_err();
        assert_eq!(err.to_string(), "Error enabling delete logs: missing channel");
    }
}
