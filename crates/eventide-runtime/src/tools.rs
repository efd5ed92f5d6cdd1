//! Preparing the dispatch tool set.
//!
//! Nothing here reads ambient state. The caller supplies a [`Scope`] (used
//! to name tracing spans), the [`Powers`] the tools may use, and
//! [`DispatchOptions`]; everything else is derived from those.
//!
//! ```rust
//! use eventide_runtime::prelude::*;
//! use futures::executor::LocalPool;
//!
//! let mut pool = LocalPool::new();
//! let powers = Powers::new(Scheduler::new(pool.spawner()));
//! let tools = prepare_dispatch_tools(&Scope::default(), powers, &DispatchOptions::default())
//!     .expect("default options are valid");
//!
//! let cell = tools.make_cell(Value::object([("answer", 42)]));
//! let answer = tools.when(&cell.get("answer").unwrap());
//! assert_eq!(pool.run_until(answer), Ok(Value::from(42)));
//! ```

use crate::cell::{CellEngine, EscapeNames};
use crate::deferred::Deferred;
use crate::dispatch::DispatchFactory;
use crate::eventual::{Eventual, StepFn, WhenFn};
use crate::handler::{Handler, HandlerFn};
use crate::scheduler::Scheduler;
use crate::value::Value;
use eventide_core::error::Result;
use eventide_core::prelude::{DetailsFormatter, EventideError, FailureTools};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, debug_span};

/// Dotted name identifying who prepared a tool set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    name: String,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sub_scope(&self, name: &str) -> Scope {
        Scope::new(format!("{}.{}", self.name, name))
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new("eventide")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Capabilities handed to the tools. Only the scheduler is required.
#[derive(Clone)]
pub struct Powers {
    scheduler: Scheduler,
    when: Option<WhenFn>,
    details: Option<Rc<dyn DetailsFormatter>>,
    make_step: Option<StepFn>,
}

impl Powers {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            when: None,
            details: None,
            make_step: None,
        }
    }

    /// Replace the adaptation of plain values into deferreds.
    pub fn with_when(mut self, when: impl Fn(&Value) -> Deferred + 'static) -> Self {
        self.when = Some(Rc::new(when));
        self
    }

    pub fn with_details(mut self, details: impl DetailsFormatter + 'static) -> Self {
        self.details = Some(Rc::new(details));
        self
    }

    pub fn with_make_step(mut self, make_step: impl Fn(Value) -> Value + 'static) -> Self {
        self.make_step = Some(Rc::new(make_step));
        self
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

impl fmt::Debug for Powers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Powers")
            .field("when", &self.when.is_some())
            .field("details", &self.details.is_some())
            .field("make_step", &self.make_step.is_some())
            .finish()
    }
}

fn default_escape_names() -> Vec<String> {
    vec!["then".to_string()]
}

/// Options for [`prepare_dispatch_tools`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOptions {
    /// Method names read directly off a cell instead of pipelined.
    #[serde(default = "default_escape_names")]
    pub escape_names: Vec<String>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            escape_names: default_escape_names(),
        }
    }
}

impl DispatchOptions {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| EventideError::InvalidOptions(e.to_string()))
    }

    /// Read options from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EventideError::InvalidOptions(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EventideError::InvalidOptions(e.to_string()))
    }

    pub fn with_escape_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            escape_names: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// The prepared tool set.
#[derive(Clone)]
pub struct DispatchTools {
    eventual: Eventual,
    engine: CellEngine,
    client: Value,
    failure: FailureTools,
}

impl DispatchTools {
    pub fn eventual(&self) -> &Eventual {
        &self.eventual
    }

    pub fn engine(&self) -> &CellEngine {
        &self.engine
    }

    /// The root client cell.
    pub fn client(&self) -> &Value {
        &self.client
    }

    pub fn failure(&self) -> &FailureTools {
        &self.failure
    }

    pub fn make_cell(&self, value: impl Into<Value>) -> Value {
        self.engine.make_cell(value)
    }

    pub fn make_root(&self, config: &Value) -> Value {
        self.engine.make_root(config)
    }

    pub fn when(&self, specimen: &Value) -> Deferred {
        self.eventual.when(specimen)
    }

    pub fn factory<'a, I>(&self, entries: I) -> Result<DispatchFactory>
    where
        I: IntoIterator<Item = (&'a str, HandlerFn)>,
    {
        DispatchFactory::new(&self.eventual, entries)
    }

    pub fn delegate(&self, target: Value, handler: Option<Handler>) -> DispatchFactory {
        DispatchFactory::delegate(&self.eventual, target, handler)
    }

    pub fn delegate_lazy(
        &self,
        get_target: impl Fn() -> Value + 'static,
        handler: Option<Handler>,
    ) -> DispatchFactory {
        DispatchFactory::delegate_lazy(&self.eventual, get_target, handler)
    }
}

impl fmt::Debug for DispatchTools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTools")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

pub fn prepare_failure_tools(scope: &Scope, powers: &Powers) -> FailureTools {
    let _span = debug_span!("prepare_failure_tools", scope = %scope).entered();
    debug!(details = powers.details.is_some(), "failure tools ready");
    FailureTools::new(powers.details.clone())
}

/// Build the eventual operation set, the cell engine and the client handle.
///
/// Fails when an escape name is not one of `then`, `catch` or `finally`.
pub fn prepare_dispatch_tools(
    scope: &Scope,
    powers: Powers,
    options: &DispatchOptions,
) -> Result<DispatchTools> {
    let _span = debug_span!("prepare_dispatch_tools", scope = %scope).entered();

    let escapes = EscapeNames::from_names(&options.escape_names)?;
    let failure = prepare_failure_tools(&scope.sub_scope("failure"), &powers);
    let eventual = Eventual::with_powers(
        powers.scheduler.clone(),
        failure.clone(),
        powers.when.clone(),
        powers.make_step.clone(),
    );

    let scheduler = powers.scheduler.clone();
    let reject_with =
        failure.make_tagger(move |err| Deferred::rejected(&scheduler, Value::from(err)));
    let engine = CellEngine::new(eventual.clone(), reject_with, escapes);
    let client = engine.make_root(&Value::empty_object());

    debug!(escape_names = ?options.escape_names, "dispatch tools ready");
    Ok(DispatchTools {
        eventual,
        engine,
        client,
        failure,
    })
}
