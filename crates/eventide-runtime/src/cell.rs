//! Pipelining cells.
//!
//! A cell is a proxy standing for "the eventual result of a chain of
//! operations". Reading a property or calling a cell never blocks: it
//! returns a child cell describing one more step. Nothing is issued
//! against the real value until a child is invoked or an escape method
//! (`then` by default) is read, and each cell resolves its target at most
//! once.
//!
//! ```text
//! root ──get a──▶ cell(a) ──get b──▶ cell(a.b) ──apply──▶ cell(a.b())
//!                                                           │
//!                                                     .then(...) escapes
//! ```
//!
//! Every cell remembers the value it was bound to, an optional property
//! name, and its parent. Traps reject any receiver other than the cell
//! itself, and calls reject any `this` other than the parent; those
//! failures surface as rejected cells so a chain is never interrupted
//! synchronously.

use crate::deferred::Deferred;
use crate::dispatch::{DispatchFactory, Traps};
use crate::eventual::Eventual;
use crate::value::{arg, FunctionRef, ObjectRef, Outcome, Value, WeakValue};
use eventide_core::prelude::{CellId, ErrorKind, EventideError, Key, Tagger, WellKnownSymbol};
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error, trace};

/// Composition methods that bypass pipelining and act on the resolved
/// target directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscapeMethod {
    Then,
    Catch,
    Finally,
}

impl EscapeMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "then" => Some(EscapeMethod::Then),
            "catch" => Some(EscapeMethod::Catch),
            "finally" => Some(EscapeMethod::Finally),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EscapeMethod::Then => "then",
            EscapeMethod::Catch => "catch",
            EscapeMethod::Finally => "finally",
        }
    }

    fn invoke(&self, target: &Deferred, args: &[Value]) -> Deferred {
        match self {
            EscapeMethod::Then => target.then(arg(args, 0), arg(args, 1)),
            EscapeMethod::Catch => target.catch(arg(args, 0)),
            EscapeMethod::Finally => target.finally(arg(args, 0)),
        }
    }
}

impl fmt::Display for EscapeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The set of escape methods a cell engine shadows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeNames(Vec<EscapeMethod>);

impl EscapeNames {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, EventideError> {
        let mut methods = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let method = EscapeMethod::parse(name)
                .ok_or_else(|| EventideError::UnknownEscapeName(name.to_string()))?;
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
        Ok(Self(methods))
    }

    pub fn contains(&self, key: &Key) -> bool {
        key.name()
            .and_then(EscapeMethod::parse)
            .map_or(false, |method| self.0.contains(&method))
    }

    pub fn methods(&self) -> &[EscapeMethod] {
        &self.0
    }
}

impl Default for EscapeNames {
    fn default() -> Self {
        Self(vec![EscapeMethod::Then])
    }
}

struct EngineInner {
    eventual: Eventual,
    reject_with: Tagger<Deferred>,
    escapes: EscapeNames,
    cell_proto: ObjectRef,
}

/// Mints pipelining cells.
#[derive(Clone)]
pub struct CellEngine {
    inner: Rc<EngineInner>,
}

impl CellEngine {
    pub fn new(eventual: Eventual, reject_with: Tagger<Deferred>, escapes: EscapeNames) -> Self {
        let cell_proto = ObjectRef::new();
        cell_proto.define(WellKnownSymbol::ToStringTag, "OCell");
        Self {
            inner: Rc::new(EngineInner {
                eventual,
                reject_with,
                escapes,
                cell_proto,
            }),
        }
    }

    pub fn eventual(&self) -> &Eventual {
        &self.inner.eventual
    }

    pub fn escape_names(&self) -> &EscapeNames {
        &self.inner.escapes
    }

    /// A root cell over `value`.
    pub fn make_cell(&self, value: impl Into<Value>) -> Value {
        self.make_bound_cell(Binding::Value(value.into()), None, None)
    }

    /// The client entry point: a root cell over an identity function
    /// carrying the own properties of `config`. Calling it with a value
    /// yields a cell for that value.
    pub fn make_root(&self, config: &Value) -> Value {
        let root = FunctionRef::new("O", |_, args| Ok(arg(&args, 0)));
        for key in config.own_keys() {
            if let Ok(value) = config.get_with_receiver(&key, config) {
                root.props().define(key, value);
            }
        }
        self.make_cell(Value::Function(root))
    }

    fn make_bound_cell(
        &self,
        bound_this: Binding,
        parent: Option<WeakValue>,
        bound_name: Option<Key>,
    ) -> Value {
        let id = CellId::new();
        let resolution = Rc::new(Resolution {
            id,
            eventual: self.inner.eventual.clone(),
            bound_this,
            bound_name,
            this_arg: OnceCell::new(),
        });
        let stub = self.make_stub(&resolution);
        let state = Rc::new(CellState {
            engine: self.clone(),
            resolution: Rc::clone(&resolution),
            parent,
            stub: stub.clone(),
            self_ref: OnceCell::new(),
        });

        let lazy = Rc::clone(&resolution);
        let factory = DispatchFactory::delegate_lazy(
            &self.inner.eventual,
            move || Value::Deferred(lazy.this_arg()),
            None,
        );
        let traps = CellTraps {
            state: Rc::clone(&state),
        };
        match factory.new_proxy(Value::Object(stub), traps) {
            Ok(cell) => {
                // Set exactly once, right after construction.
                let _ = state.self_ref.set(cell.downgrade());
                trace!(cell = %id, name = ?resolution.bound_name, "cell created");
                cell
            }
            Err(err) => {
                error!(cell = %id, %err, "cell construction failed");
                let reason = match err {
                    EventideError::Tagged(tagged) => Value::from(tagged),
                    other => Value::from(other.to_string()),
                };
                Value::Deferred(Deferred::rejected(self.inner.eventual.scheduler(), reason))
            }
        }
    }

    fn make_stub(&self, resolution: &Rc<Resolution>) -> ObjectRef {
        let stub = ObjectRef::with_proto(Value::Object(self.inner.cell_proto.clone()));
        for &method in self.inner.escapes.methods() {
            let resolution = Rc::clone(resolution);
            stub.define(
                method.name(),
                Value::function(method.name(), move |_, args| {
                    Ok(Value::Deferred(method.invoke(&resolution.this_arg(), &args)))
                }),
            );
        }
        stub
    }

    fn rejected_cell(&self, reason: Deferred) -> Value {
        self.make_bound_cell(Binding::Value(Value::Deferred(reason)), None, None)
    }
}

impl fmt::Debug for CellEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellEngine")
            .field("escapes", &self.inner.escapes)
            .finish_non_exhaustive()
    }
}

/// What a cell is about: a value, or the target of the cell it was read
/// from. The latter is only resolved once this cell is used.
enum Binding {
    Value(Value),
    Parent(Rc<Resolution>),
}

impl Binding {
    fn value(&self) -> Value {
        match self {
            Binding::Value(value) => value.clone(),
            Binding::Parent(parent) => Value::Deferred(parent.this_arg()),
        }
    }
}

/// How a cell finds its target. Resolved lazily, at most once.
struct Resolution {
    id: CellId,
    eventual: Eventual,
    bound_this: Binding,
    bound_name: Option<Key>,
    this_arg: OnceCell<Deferred>,
}

impl Resolution {
    fn this_arg(&self) -> Deferred {
        self.this_arg
            .get_or_init(|| {
                trace!(cell = %self.id, "resolving target");
                let bound_this = self.bound_this.value();
                match &self.bound_name {
                    None => self.eventual.when(&bound_this),
                    Some(name) => {
                        let read = self.eventual.get(&bound_this, name.clone());
                        self.eventual.when(&Value::Deferred(read))
                    }
                }
            })
            .clone()
    }
}

struct CellState {
    engine: CellEngine,
    resolution: Rc<Resolution>,
    parent: Option<WeakValue>,
    stub: ObjectRef,
    self_ref: OnceCell<WeakValue>,
}

impl CellState {
    fn is_self(&self, value: &Value) -> bool {
        self.self_ref.get().map_or(false, |me| me.is(value))
    }

    fn is_parent(&self, value: &Value) -> bool {
        self.parent.as_ref().map_or(false, |parent| parent.is(value))
    }

    fn child(&self, bound_this: Binding, bound_name: Option<Key>) -> Value {
        self.engine
            .make_bound_cell(bound_this, self.self_ref.get().cloned(), bound_name)
    }

    fn reject(&self, template: &str, details: &[&dyn fmt::Display]) -> Deferred {
        self.engine
            .inner
            .reject_with
            .fail_as(ErrorKind::TypeError, template, details)
    }
}

struct CellTraps {
    state: Rc<CellState>,
}

impl Traps for CellTraps {
    fn get(&self, _target: &Value, key: &Key, receiver: &Value) -> Value {
        let state = &self.state;
        if !state.is_self(receiver) {
            let reason = state.reject("Unexpected receiver {} for get {}", &[receiver, key]);
            return state.engine.rejected_cell(reason);
        }
        if state.engine.inner.escapes.contains(key) {
            return state.stub.get_own(key).unwrap_or_default();
        }
        if *key == Key::Symbol(WellKnownSymbol::ToPrimitive) {
            return Value::Undefined;
        }
        let parent = Binding::Parent(Rc::clone(&state.resolution));
        state.child(parent, Some(key.clone()))
    }

    fn apply(&self, _target: &Value, this: &Value, args: Vec<Value>) -> Outcome {
        let state = &self.state;
        if !this.is_undefined() && !state.is_parent(this) {
            let reason = state.reject("Unexpected thisArg {}", &[this]);
            return Ok(state.engine.rejected_cell(reason));
        }
        let resolution = &state.resolution;
        let eventual = &state.engine.inner.eventual;
        let bound_this = resolution.bound_this.value();
        let result = match &resolution.bound_name {
            None => eventual.apply(&bound_this, args),
            Some(name) => eventual.send(&bound_this, Some(name.clone()), args),
        };
        Ok(state.child(Binding::Value(Value::Deferred(result)), None))
    }

    fn set(&self, _target: &Value, key: &Key, value: Value, receiver: &Value) -> bool {
        let state = &self.state;
        if !state.is_self(receiver) {
            // Signalled, not sunk: it surfaces as an unobserved rejection.
            let _signal = state.reject("Unexpected receiver {} for set {}", &[receiver, key]);
            debug!(%key, "cell set refused for foreign receiver");
            return false;
        }
        if state.engine.inner.escapes.contains(key) {
            return false;
        }
        let this_arg = Value::Deferred(state.resolution.this_arg());
        state
            .engine
            .inner
            .eventual
            .set(&this_arg, key.clone(), value.clone())
            .sink();
        state.stub.define(key.clone(), value);
        true
    }

    fn delete_property(&self, _target: &Value, key: &Key) -> bool {
        let state = &self.state;
        if state.engine.inner.escapes.contains(key) {
            return false;
        }
        let this_arg = Value::Deferred(state.resolution.this_arg());
        state
            .engine
            .inner
            .eventual
            .delete(&this_arg, key.clone())
            .sink();
        state.stub.remove(key);
        true
    }

    fn own_keys(&self, _target: &Value) -> Vec<Key> {
        self.state.stub.keys()
    }
}
