//! # Eventide
//!
//! Pipelined eventual references for single-threaded async Rust.
//!
//! Eventide lets you describe work against a value that has not arrived
//! yet. Property reads and method calls on a *cell* return new cells at
//! once; nothing reaches the real target until the chain is awaited, and
//! every step runs on a later turn of the scheduler you supply.
//!
//! ## Quick Start
//!
//! ```rust
//! use eventide::prelude::*;
//! use futures::executor::LocalPool;
//!
//! let mut pool = LocalPool::new();
//! let powers = Powers::new(Scheduler::new(pool.spawner()));
//! let tools = prepare_dispatch_tools(&Scope::new("quickstart"), powers, &DispatchOptions::default())
//!     .expect("default options are valid");
//!
//! // A value that arrives later
//! let (account, resolver) = Deferred::pending(tools.eventual().scheduler());
//!
//! // Build the chain before it exists
//! let balance = tools.make_cell(account).get("wallet").unwrap().invoke("balance", vec![]).unwrap();
//!
//! resolver.resolve(Value::object([(
//!     "wallet",
//!     Value::object([("balance", Value::function("balance", |_, _| Ok(Value::from(120))))]),
//! )]));
//!
//! assert_eq!(pool.run_until(tools.when(&balance)), Ok(Value::from(120)));
//! ```
//!
//! ## Architecture
//!
//! Eventide is organized into two crates:
//!
//! - [`eventide_core`] - Keys, operation kinds, tagged errors, failure tools
//! - [`eventide_runtime`] - Values, deferreds, the eventual operation set,
//!   the dispatch factory and the cell engine
//!
//! ## Key Concepts
//!
//! ### Handled Operations
//!
//! | Operation | Factory name | What It Does |
//! |-----------|--------------|--------------|
//! | GET | `get` | Read a property |
//! | SET | `set` | Assign a property, fulfills with the value |
//! | DELETE | `delete` | Remove a property, fulfills with success |
//! | APPLY | `apply` | Call the target as a function |
//! | SEND | `send` | Call a method on the target |
//!
//! ### Handlers and Presences
//!
//! A [`Handler`](prelude::Handler) intercepts eventual operations issued
//! against a pending deferred or a presence. A
//! [`DispatchFactory`](prelude::DispatchFactory) mints presences, proxies
//! and handled deferreds that all route to one handler.
//!
//! ### Escape Names
//!
//! Reading `then` from a cell does not pipeline; it returns a function
//! that awaits the cell's target. `catch` and `finally` can be enabled the
//! same way through [`DispatchOptions`](prelude::DispatchOptions).
//!
//! ## Failure Tagging
//!
//! ```rust
//! use eventide::prelude::*;
//!
//! let tools = FailureTools::new(Some(std::rc::Rc::new(QuotedDetails)));
//! let err = tools.create_error(ErrorKind::RangeError, "index {} out of range", &[&"7"]);
//! assert_eq!(err.to_string(), "RangeError: index \"7\" out of range");
//! ```

// Re-export all subcrates
pub use eventide_core as core;
pub use eventide_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust
/// use eventide::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use eventide_core::key::{Key, WellKnownSymbol};
    pub use eventide_core::types::{CellId, DeferredId, OpKind};

    // Error types
    pub use eventide_core::error::{ErrorKind, EventideError, Result, TaggedError};

    // Failure tagging
    pub use eventide_core::failure::{
        interpolate, DetailsFormatter, FailureTools, QuotedDetails, Tagger,
    };

    // Values
    pub use eventide_runtime::value::{
        arg, FunctionRef, Interceptable, ObjectRef, Outcome, Value, WeakValue,
    };

    // Scheduling and deferreds
    pub use eventide_runtime::deferred::{Deferred, Resolver, WeakDeferred};
    pub use eventide_runtime::scheduler::{Scheduler, Spawner};

    // Dispatch
    pub use eventide_runtime::dispatch::{
        DispatchFactory, ForwardingTraps, RevocableProxy, Revoker, Traps,
    };
    pub use eventide_runtime::eventual::{Eventual, StepFn, WhenFn};
    pub use eventide_runtime::handler::{Handler, HandlerBuilder, HandlerFn, Operation};

    // Cells and tool preparation
    pub use eventide_runtime::cell::{CellEngine, EscapeMethod, EscapeNames};
    pub use eventide_runtime::tools::{
        prepare_dispatch_tools, prepare_failure_tools, DispatchOptions, DispatchTools, Powers,
        Scope,
    };
}
