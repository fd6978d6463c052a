//! Handler system for the Rikka framework.
//!
//! A handler is the last link of a registration: it receives the shared
//! [`EventContext`] once every middleware in front of it has let the event
//! through.
//!
//! # Example
//!
//! ```rust,ignore
//! use rikka_framework::{handler_fn, HandlerResult};
//!
//! async fn on_message(ctx: Arc<EventContext>) -> HandlerResult {
//!     if let Some(msg) = ctx.message() {
//!         tracing::info!(content = %msg.content, "Message received");
//!     }
//!     Ok(())
//! }
//!
//! builder.register(EventKind::MessageCreate, vec![], handler_fn(on_message));
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use rikka_core::EventContext;

use crate::error::HandlerResult;

// ============================================================================
// EventHandler Trait
// ============================================================================

/// The core trait for event handlers.
///
/// Handlers report failures by returning a [`HandlerError`](crate::HandlerError);
/// the dispatcher logs it and posts `"{context}: {error}"` to the channel the
/// event came from.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Handles one event.
    async fn handle(&self, ctx: Arc<EventContext>) -> HandlerResult;
}

/// A type-erased, shareable handler.
pub type BoxedEventHandler = Arc<dyn EventHandler>;

#[async_trait]
impl<H: EventHandler + ?Sized> EventHandler for Arc<H> {
    async fn handle(&self, ctx: Arc<EventContext>) -> HandlerResult {
        (**self).handle(ctx).await
    }
}

// ============================================================================
// Closure handlers
// ============================================================================

/// An [`EventHandler`] backed by an async closure. Created by [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Wraps an async closure as an [`EventHandler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Arc<EventContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> EventHandler for HandlerFn<F>
where
    F: Fn(Arc<EventContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: Arc<EventContext>) -> HandlerResult {
        (self.f)(ctx).await
    }
}
