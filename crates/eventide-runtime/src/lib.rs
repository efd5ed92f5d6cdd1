//! # Eventide Runtime
//!
//! Deferred values, the eventual operation set, the dispatch factory and
//! pipelining cells, all on a single-threaded cooperative scheduler.
//!
//! ## Layers
//!
//! - [`value`]: the dynamic value model operations act on
//! - [`scheduler`]: the `!Send` executor seam
//! - [`deferred`]: placeholders that settle once, optionally handled
//! - [`handler`]: intercepting operation sets
//! - [`eventual`]: `get`, `apply`, `send`, `set`, `delete` and friends
//! - [`dispatch`]: factories for handled deferreds, presences and proxies
//! - [`cell`]: the chain builder
//! - [`tools`]: wiring it all from explicit powers and options
//!
//! ## Unhandled rejections
//!
//! A rejected [`Deferred`](deferred::Deferred) that is dropped without
//! anyone awaiting or chaining it is reported with `tracing::warn!` on the
//! `eventide::unhandled` target.

pub mod cell;
pub mod deferred;
pub mod dispatch;
pub mod eventual;
pub mod handler;
pub mod scheduler;
pub mod tools;
pub mod value;
pub mod prelude;
