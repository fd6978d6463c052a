//! Tower integration for middleware and handlers.
//!
//! A registration is a tower service stack: a [`HandlerService`] at the
//! bottom and one [`MiddlewareLayer`] per middleware on top, the first
//! middleware outermost.
//!
//! ```text
//! MiddlewareService(ExcludeBotAuthors)
//!     └─ MiddlewareService(RequireGuildOwner)
//!           └─ HandlerService(log command)
//! ```
//!
//! A middleware that suppresses the event short-circuits the stack with
//! [`EventSkipped`], which the dispatcher treats as a silent non-match.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use rikka_core::EventContext;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Layer, Service, ServiceExt};
use tracing::trace;

use crate::error::EventSkipped;
use crate::handler::BoxedEventHandler;
use crate::middleware::BoxedMiddleware;

/// A type-erased, `Clone + Send + Sync` tower service that processes
/// `Arc<EventContext>`.
///
/// The error type is [`BoxError`]: middleware layers return [`EventSkipped`]
/// on suppression, handlers return [`HandlerError`](crate::HandlerError).
pub type BoxedHandlerService = BoxCloneSyncService<Arc<EventContext>, (), BoxError>;

// ============================================================================
// MiddlewareLayer
// ============================================================================

/// Applies a [`Middleware`](crate::Middleware) in front of an inner service.
#[derive(Clone)]
pub struct MiddlewareLayer {
    middleware: BoxedMiddleware,
}

impl MiddlewareLayer {
    pub fn new(middleware: BoxedMiddleware) -> Self {
        Self { middleware }
    }
}

impl<S> Layer<S> for MiddlewareLayer {
    type Service = MiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MiddlewareService {
            middleware: Arc::clone(&self.middleware),
            inner,
        }
    }
}

pub struct MiddlewareService<S> {
    middleware: BoxedMiddleware,
    inner: S,
}

impl<S> Clone for MiddlewareService<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        MiddlewareService {
            middleware: Arc::clone(&self.middleware),
            inner: self.inner.clone(),
        }
    }
}

impl<S> Service<Arc<EventContext>> for MiddlewareService<S>
where
    S: Service<Arc<EventContext>, Response = (), Error = BoxError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<EventContext>) -> Self::Future {
        let middleware = Arc::clone(&self.middleware);
        let inner = self.inner.clone();
        async move {
            match middleware.process(ctx).await {
                Some(ctx) => inner.oneshot(ctx).await,
                None => {
                    trace!(middleware = middleware.name(), "Event suppressed");
                    Err(Box::new(EventSkipped) as BoxError)
                }
            }
        }
        .boxed()
    }
}

// ============================================================================
// HandlerService
// ============================================================================

/// A tower [`Service`] that calls a single [`EventHandler`](crate::EventHandler).
#[derive(Clone)]
pub struct HandlerService {
    handler: BoxedEventHandler,
}

impl HandlerService {
    pub fn new(handler: BoxedEventHandler) -> Self {
        Self { handler }
    }
}

impl Service<Arc<EventContext>> for HandlerService {
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<EventContext>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        async move { handler.handle(ctx).await.map_err(BoxError::from) }.boxed()
    }
}

/// Builds the service stack for one registration.
///
/// The first middleware in `middlewares` runs first.
pub fn build_stack(middlewares: Vec<BoxedMiddleware>, handler: BoxedEventHandler) -> BoxedHandlerService {
    middlewares.into_iter().rev().fold(
        BoxCloneSyncService::new(HandlerService::new(handler)),
        |inner, middleware| BoxCloneSyncService::new(MiddlewareLayer::new(middleware).layer(inner)),
    )
}
