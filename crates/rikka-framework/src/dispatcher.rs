//! Event dispatcher for the Rikka framework.
//!
//! Registrations are collected by a [`DispatcherBuilder`] during startup and
//! frozen by [`DispatcherBuilder::build`] into a [`Dispatcher`]: a shared,
//! read-only table of service stacks plus an index by [`EventKind`]. Nothing
//! is registered after startup, so dispatch takes no locks.
//!
//! When an event is dispatched:
//!
//! 1. Every registration for the event's kind is started concurrently
//! 2. Within a registration, middleware runs in order, then the handler
//! 3. A suppressed registration is skipped silently
//! 4. A failed handler is logged and a `"{context}: {error}"` notice is posted
//!    to the originating channel; other registrations are unaffected
//!
//! ```rust,ignore
//! let mut builder = DispatcherBuilder::new();
//! builder.register(
//!     EventKind::MessageCreate,
//!     vec![Arc::new(ExcludeBotAuthors)],
//!     handler_fn(track_message),
//! );
//! let dispatcher = builder.build();
//!
//! let handled = dispatcher.dispatch(event, gateway).await;
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use rikka_core::{BoxedGateway, EventContext, EventKind, GatewayEvent, OutgoingMessage};
use tower::{BoxError, ServiceExt};
use tracing::{Instrument, Level, debug, error, span, trace, warn};

use crate::command::Command;
use crate::error::{EventSkipped, HandlerError};
use crate::handler::EventHandler;
use crate::middleware::BoxedMiddleware;
use crate::service::{BoxedHandlerService, build_stack};

struct Registration {
    kind: EventKind,
    name: &'static str,
    service: BoxedHandlerService,
}

// ============================================================================
// DispatcherBuilder
// ============================================================================

/// Collects registrations during the startup phase.
#[derive(Default)]
pub struct DispatcherBuilder {
    registrations: Vec<Registration>,
}

impl DispatcherBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events of `kind`, behind `middlewares`.
    ///
    /// Middleware runs in the given order. Several registrations may share a
    /// kind; they run concurrently.
    pub fn register<H>(
        &mut self,
        kind: EventKind,
        middlewares: Vec<BoxedMiddleware>,
        handler: H,
    ) -> &mut Self
    where
        H: EventHandler,
    {
        let name = std::any::type_name::<H>();
        debug!(kind = %kind, handler = name, middlewares = middlewares.len(), "Registering handler");
        self.registrations.push(Registration {
            kind,
            name,
            service: build_stack(middlewares, Arc::new(handler)),
        });
        self
    }

    /// Lets `command` add its registrations.
    pub fn install(&mut self, command: &dyn Command) -> &mut Self {
        command.register(self);
        self
    }

    /// Returns the number of registrations so far.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Freezes the table.
    pub fn build(self) -> Dispatcher {
        let mut index = vec![Vec::new(); EventKind::ALL.len()];
        for (i, registration) in self.registrations.iter().enumerate() {
            index[registration.kind.index()].push(i);
        }
        Dispatcher {
            registrations: self.registrations.into(),
            index: index.into(),
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// The frozen registration table. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    registrations: Arc<[Registration]>,
    index: Arc<[Vec<usize>]>,
}

impl Dispatcher {
    /// Returns the total number of registrations.
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    /// Returns the number of registrations for `kind`.
    pub fn registrations_for(&self, kind: EventKind) -> usize {
        self.index.get(kind.index()).map_or(0, Vec::len)
    }

    /// Dispatches an event to every registration for its kind.
    ///
    /// Returns the number of handlers that ran, successfully or not.
    /// Suppressed registrations are not counted.
    pub async fn dispatch(&self, event: GatewayEvent, gateway: BoxedGateway) -> usize {
        let span = span!(Level::DEBUG, "dispatch", event = %event.name());
        self.dispatch_inner(event, gateway).instrument(span).await
    }

    async fn dispatch_inner(&self, event: GatewayEvent, gateway: BoxedGateway) -> usize {
        let kind = event.kind();
        let ctx = Arc::new(EventContext::new(event, gateway));

        let targets = self.index.get(kind.index()).map_or(&[][..], Vec::as_slice);
        if targets.is_empty() {
            trace!("No registrations for event");
            return 0;
        }

        let calls = targets.iter().map(|&i| {
            let registration = &self.registrations[i];
            let service = registration.service.clone();
            let ctx = Arc::clone(&ctx);
            async move { (registration.name, service.oneshot(ctx).await) }
        });

        let mut ran = 0;
        for (name, result) in join_all(calls).await {
            match result {
                Ok(()) => ran += 1,
                Err(e) if e.is::<EventSkipped>() => {
                    trace!(handler = name, "Registration skipped");
                }
                Err(e) => {
                    ran += 1;
                    report_failure(&ctx, name, e).await;
                }
            }
        }
        ran
    }
}

/// Logs a handler failure and posts the notice to the originating channel.
async fn report_failure(ctx: &EventContext, handler: &'static str, err: BoxError) {
    let notice = match err.downcast_ref::<HandlerError>() {
        Some(he) => {
            error!(handler, context = %he.context, error = %he.source, "Handler failed");
            he.to_string()
        }
        None => {
            error!(handler, error = %err, "Handler failed");
            err.to_string()
        }
    };

    let Some(channel_id) = ctx.channel_id() else {
        return;
    };
    if let Err(e) = ctx
        .gateway()
        .send_message(channel_id, OutgoingMessage::text(notice))
        .await
    {
        warn!(channel_id = %channel_id, error = %e, "Failed to post error notice");
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registration_count", &self.registrations.len())
            .finish()
    }
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("registration_count", &self.registrations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use crate::handler::handler_fn;
    use crate::middleware::{ExcludeBotAuthors, Middleware};
    use crate::testing::{CHANNEL, MockGateway, message_event, user};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counter_handler(
        counter: &Arc<AtomicUsize>,
        add: usize,
    ) -> impl EventHandler + use<> {
        let counter = Arc::clone(counter);
        handler_fn(move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(add, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    struct Suppress(Arc<AtomicUsize>);

    #[async_trait]
    impl Middleware for Suppress {
        fn name(&self) -> &'static str {
            "suppress"
        }

        async fn process(&self, _ctx: Arc<EventContext>) -> Option<Arc<EventContext>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    struct Observe(Arc<AtomicUsize>);

    #[async_trait]
    impl Middleware for Observe {
        fn name(&self) -> &'static str {
            "observe"
        }

        async fn process(&self, ctx: Arc<EventContext>) -> Option<Arc<EventContext>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Some(ctx)
        }
    }

    fn human_message() -> GatewayEvent {
        message_event(Some(user(5, false)), "hello")
    }

    #[tokio::test]
    async fn test_dispatch_no_registrations() {
        let dispatcher = DispatcherBuilder::new().build();
        let gateway = Arc::new(MockGateway::default());
        assert_eq!(dispatcher.dispatch(human_message(), gateway).await, 0);
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_kind() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut builder = DispatcherBuilder::new();
        builder
            .register(EventKind::MessageCreate, vec![], counter_handler(&counter, 1))
            .register(EventKind::MessageCreate, vec![], counter_handler(&counter, 10))
            .register(EventKind::MessageDelete, vec![], counter_handler(&counter, 100));
        let dispatcher = builder.build();

        assert_eq!(dispatcher.registrations_for(EventKind::MessageCreate), 2);
        let ran = dispatcher
            .dispatch(human_message(), Arc::new(MockGateway::default()))
            .await;

        assert_eq!(ran, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn test_first_suppressing_middleware_short_circuits() {
        let counter = Arc::new(AtomicUsize::new(0));
        let suppressed = Arc::new(AtomicUsize::new(0));
        let observed = Arc::new(AtomicUsize::new(0));

        let mut builder = DispatcherBuilder::new();
        builder.register(
            EventKind::MessageCreate,
            vec![
                Arc::new(Suppress(Arc::clone(&suppressed))) as BoxedMiddleware,
                Arc::new(Observe(Arc::clone(&observed))),
            ],
            counter_handler(&counter, 1),
        );
        let dispatcher = builder.build();

        let ran = dispatcher
            .dispatch(human_message(), Arc::new(MockGateway::default()))
            .await;

        assert_eq!(ran, 0);
        assert_eq!(suppressed.load(Ordering::SeqCst), 1);
        assert_eq!(observed.load(Ordering::SeqCst), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bot_messages_skip_gated_registration_only() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut builder = DispatcherBuilder::new();
        builder
            .register(
                EventKind::MessageCreate,
                vec![Arc::new(ExcludeBotAuthors) as BoxedMiddleware],
                counter_handler(&counter, 1),
            )
            .register(EventKind::MessageCreate, vec![], counter_handler(&counter, 10));
        let dispatcher = builder.build();

        let bot_message = message_event(Some(user(6, true)), "beep");
        let ran = dispatcher
            .dispatch(bot_message, Arc::new(MockGateway::default()))
            .await;

        assert_eq!(ran, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_handler_error_is_isolated_and_reported() {
        let counter = Arc::new(AtomicUsize::new(0));
        let gateway = Arc::new(MockGateway::default());

        async fn failing(_ctx: Arc<EventContext>) -> HandlerResult {
            Err(HandlerError::new("Error enabling delete logs", "channel 7 not found"))
        }

        let mut builder = DispatcherBuilder::new();
        builder
            .register(EventKind::MessageCreate, vec![], handler_fn(failing))
            .register(EventKind::MessageCreate, vec![], counter_handler(&counter, 1));
        let dispatcher = builder.build();

        let ran = dispatcher.dispatch(human_message(), gateway.clone()).await;

        assert_eq!(ran, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(
            gateway.sent_texts(),
            vec![(
                CHANNEL,
                "Error enabling delete logs: channel 7 not found".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_registrations_run_concurrently() {
        let counter = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());

        let waiter = {
            let gate = Arc::clone(&gate);
            handler_fn(move |_| {
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                    Ok(())
                }
            })
        };
        let opener = {
            let gate = Arc::clone(&gate);
            let counter = Arc::clone(&counter);
            handler_fn(move |_| {
                let gate = Arc::clone(&gate);
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    gate.notify_one();
                    Ok(())
                }
            })
        };

        let mut builder = DispatcherBuilder::new();
        builder
            .register(EventKind::MessageCreate, vec![], waiter)
            .register(EventKind::MessageCreate, vec![], opener);
        let dispatcher = builder.build();

        // The first handler only finishes once the second has run.
        let ran = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.dispatch(human_message(), Arc::new(MockGateway::default())),
        )
        .await
        .expect("dispatch deadlocked");
        assert_eq!(ran, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatcher_is_send_sync_clone() {
        fn assert_traits<T: Send + Sync + Clone>() {}
        assert_traits::<Dispatcher>();
    }
}
