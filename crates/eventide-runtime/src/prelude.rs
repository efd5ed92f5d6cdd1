//! Eventide Runtime Prelude - convenient imports for common usage.
//!
//! ```rust
//! use eventide_runtime::prelude::*;
//! ```

pub use eventide_core::prelude::*;

pub use crate::value::{arg, FunctionRef, Interceptable, ObjectRef, Outcome, Value, WeakValue};

pub use crate::scheduler::{Scheduler, Spawner};

pub use crate::deferred::{Deferred, Resolver, WeakDeferred};

pub use crate::handler::{Handler, HandlerBuilder, HandlerFn, Operation};

pub use crate::eventual::{Eventual, StepFn, WhenFn};

pub use crate::dispatch::{DispatchFactory, ForwardingTraps, RevocableProxy, Revoker, Traps};

pub use crate::cell::{CellEngine, EscapeMethod, EscapeNames};

pub use crate::tools::{
    prepare_dispatch_tools, prepare_failure_tools, DispatchOptions, DispatchTools, Powers, Scope,
};
