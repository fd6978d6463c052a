//! # Rikka Framework
//!
//! Event dispatch components for building the bot.
//!
//! This layer provides:
//! - [`Middleware`] filters and the three capability checks
//!   ([`ExcludeBotAuthors`], [`RequireBotOwner`], [`RequireGuildOwner`])
//! - Tower integration: each middleware is a [`MiddlewareLayer`] over a
//!   [`HandlerService`]
//! - Text command matching and argument parsing ([`command`])
//! - The [`EventHandler`] trait and [`handler_fn`] for closures
//! - [`DispatcherBuilder`] and the frozen, lock-free [`Dispatcher`]

pub mod command;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod service;

#[cfg(test)]
mod testing;

pub use command::{Args, CHANNEL_MENTION, Command, USER_MENTION, extract_id};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{
    ArgsError, ArgsResult, EventSkipped, HandlerError, HandlerResult, ResultExt,
};
pub use handler::{BoxedEventHandler, EventHandler, HandlerFn, handler_fn};
pub use middleware::{
    BoxedMiddleware, ExcludeBotAuthors, Middleware, RequireBotOwner, RequireGuildOwner,
};
pub use service::{BoxedHandlerService, HandlerService, MiddlewareLayer, MiddlewareService};
