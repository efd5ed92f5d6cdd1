//! The dispatch factory.
//!
//! A [`DispatchFactory`] owns one [`Handler`] and mints values that are
//! routed to it: resolved-immediately deferreds, presences built from a
//! prototype or a step, and proxies whose synchronous traps are supplied
//! separately while their eventual operations go to the handler.
//!
//! Factories come from a name-to-operation table ([`DispatchFactory::new`])
//! or from delegation to a target ([`DispatchFactory::delegate_lazy`]) where
//! the handler may supply only some operations and the factory falls back
//! to the ordinary eventual operation on the target for the rest.

use crate::deferred::Deferred;
use crate::eventual::Eventual;
use crate::handler::{Handler, HandlerFn};
use crate::value::{type_error, Interceptable, ObjectRef, Outcome, Value};
use eventide_core::error::Result;
use eventide_core::prelude::{ErrorKind, Key, OpKind};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Synchronous behavior of a proxy. Every trap defaults to forwarding to
/// the target.
pub trait Traps {
    fn get(&self, target: &Value, key: &Key, receiver: &Value) -> Value {
        target.get_with_receiver(key, receiver).unwrap_or_default()
    }

    fn set(&self, target: &Value, key: &Key, value: Value, _receiver: &Value) -> bool {
        target.set(key.clone(), value).unwrap_or(false)
    }

    fn delete_property(&self, target: &Value, key: &Key) -> bool {
        target.delete(key.clone()).unwrap_or(false)
    }

    fn apply(&self, target: &Value, this: &Value, args: Vec<Value>) -> Outcome {
        target.call(this, args)
    }

    fn own_keys(&self, target: &Value) -> Vec<Key> {
        target.own_keys()
    }
}

/// Traps that forward everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardingTraps;

impl Traps for ForwardingTraps {}

/// Shared on/off switch for a proxy's synchronous traps.
#[derive(Clone)]
struct TrapGate(Rc<Cell<bool>>);

impl TrapGate {
    fn disabled() -> Self {
        Self(Rc::new(Cell::new(false)))
    }

    fn is_enabled(&self) -> bool {
        self.0.get()
    }

    fn enable_on_drop(&self) -> GateGuard {
        GateGuard(self.clone())
    }
}

struct GateGuard(TrapGate);

impl Drop for GateGuard {
    fn drop(&mut self) {
        (self.0).0.set(true);
    }
}

struct Proxy {
    target: Value,
    traps: Rc<dyn Traps>,
    handler: Handler,
    gate: TrapGate,
    revoked: Rc<Cell<bool>>,
}

impl Proxy {
    fn live(&self) -> bool {
        self.gate.is_enabled() && !self.revoked.get()
    }
}

fn tag_of(value: &Value) -> String {
    match value {
        Value::Object(o) => o.plain_tag().unwrap_or_else(|| "Object".to_string()),
        Value::Exotic(e) => e.string_tag(),
        _ => "Object".to_string(),
    }
}

impl Interceptable for Proxy {
    fn get(&self, key: &Key, receiver: &Value) -> Value {
        if !self.live() {
            return Value::Undefined;
        }
        self.traps.get(&self.target, key, receiver)
    }

    fn set(&self, key: &Key, value: Value, receiver: &Value) -> bool {
        self.live() && self.traps.set(&self.target, key, value, receiver)
    }

    fn delete(&self, key: &Key) -> bool {
        self.live() && self.traps.delete_property(&self.target, key)
    }

    fn apply(&self, this: &Value, args: Vec<Value>) -> Outcome {
        if !self.live() {
            return Ok(Value::Undefined);
        }
        self.traps.apply(&self.target, this, args)
    }

    fn own_keys(&self) -> Vec<Key> {
        if !self.live() {
            return Vec::new();
        }
        self.traps.own_keys(&self.target)
    }

    fn eventual_handler(&self) -> Option<Handler> {
        if self.revoked.get() {
            return Some(Handler::inert());
        }
        Some(self.handler.clone())
    }

    fn string_tag(&self) -> String {
        tag_of(&self.target)
    }
}

/// A presence: an object whose eventual behavior is its handler's.
struct Presence {
    shape: ObjectRef,
    handler: Handler,
}

impl Interceptable for Presence {
    fn get(&self, key: &Key, receiver: &Value) -> Value {
        Value::Object(self.shape.clone())
            .get_with_receiver(key, receiver)
            .unwrap_or_default()
    }

    fn set(&self, key: &Key, value: Value, _receiver: &Value) -> bool {
        self.shape.define(key.clone(), value);
        true
    }

    fn delete(&self, key: &Key) -> bool {
        self.shape.remove(key);
        true
    }

    fn apply(&self, _this: &Value, _args: Vec<Value>) -> Outcome {
        Err(type_error("presence is not a function"))
    }

    fn own_keys(&self) -> Vec<Key> {
        self.shape.keys()
    }

    fn eventual_handler(&self) -> Option<Handler> {
        Some(self.handler.clone())
    }

    fn string_tag(&self) -> String {
        tag_of(&Value::Object(self.shape.clone()))
    }
}

/// One-shot revocation action for a revocable proxy.
pub struct Revoker {
    flag: Rc<Cell<bool>>,
}

impl Revoker {
    /// Permanently disable the proxy's traps and handler.
    pub fn revoke(self) {
        self.flag.set(true);
        debug!("proxy revoked");
    }

    pub fn is_revoked(&self) -> bool {
        self.flag.get()
    }
}

impl fmt::Debug for Revoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Revoker")
            .field("revoked", &self.flag.get())
            .finish()
    }
}

pub struct RevocableProxy {
    pub proxy: Value,
    pub revoke: Revoker,
}

#[derive(Clone)]
pub struct DispatchFactory {
    handler: Handler,
    eventual: Eventual,
}

impl DispatchFactory {
    /// Build a factory from `(name, operation)` entries. Names must be one
    /// of `get`, `apply`, `send`, `set` or `delete`.
    pub fn new<'a, I>(eventual: &Eventual, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, HandlerFn)>,
    {
        let throw_with = eventual.failure().throw_with();
        let mut builder = Handler::builder();
        for (name, op) in entries {
            let kind = OpKind::from_factory_name(name).ok_or_else(|| {
                throw_with.fail_as(
                    ErrorKind::TypeError,
                    "Cannot map DispatchFactory method {} to a handled operation",
                    &[&name],
                )
            })?;
            builder = builder.insert(kind, op);
        }
        let handler = builder.build();
        debug!(ops = ?handler.kinds(), "dispatch factory created");
        Ok(Self {
            handler,
            eventual: eventual.clone(),
        })
    }

    /// Delegate every handled operation to the value `get_target` returns,
    /// asking it afresh for each operation. Operations `handler` supplies
    /// run against that value; the rest become ordinary eventual
    /// operations on it.
    pub fn delegate_lazy(
        eventual: &Eventual,
        get_target: impl Fn() -> Value + 'static,
        handler: Option<Handler>,
    ) -> Self {
        let get_target: Rc<dyn Fn() -> Value> = Rc::new(get_target);
        let mut builder = Handler::builder();
        for kind in OpKind::HANDLED {
            let eventual = eventual.clone();
            let user = handler.as_ref().and_then(|h| h.lookup(kind));
            let get_target = Rc::clone(&get_target);
            builder = builder.on(kind, move |_, op| {
                let target = get_target();
                match &user {
                    Some(handle) => handle(&target, op),
                    None => Ok(Value::Deferred(eventual.dispatch(&target, op))),
                }
            });
        }
        Self {
            handler: builder.build(),
            eventual: eventual.clone(),
        }
    }

    pub fn delegate(eventual: &Eventual, target: Value, handler: Option<Handler>) -> Self {
        Self::delegate_lazy(eventual, move || target.clone(), handler)
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn eventual(&self) -> &Eventual {
        &self.eventual
    }

    /// A deferred resolved with `value` that stays routed to this factory's
    /// handler until it settles on the next turn.
    pub fn promise_resolve(&self, value: Value) -> Deferred {
        Deferred::with_handler(self.eventual.scheduler(), value, self.handler.clone())
    }

    /// A presence with prototype `proto` and the given own properties.
    pub fn object_create<K, V>(
        &self,
        proto: Value,
        props: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Value>
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        let shape = ObjectRef::new();
        let presence = self.presence(shape.clone())?;
        shape.set_proto(proto);
        for (key, value) in props {
            shape.define(key, value);
        }
        Ok(presence)
    }

    /// A presence shaped like the step built from `resolution`: same
    /// prototype, same own properties.
    pub fn make_step(&self, resolution: Value) -> Result<Value> {
        let raw = self.eventual.make_step(resolution);
        let shape = ObjectRef::new();
        let presence = self.presence(shape.clone())?;
        if let Value::Object(o) = &raw {
            shape.set_proto(o.proto());
        }
        for key in raw.own_keys() {
            if let Ok(value) = raw.get_with_receiver(&key, &raw) {
                shape.define(key, value);
            }
        }
        Ok(presence)
    }

    pub fn new_proxy(
        &self,
        target: Value,
        traps: impl Traps + 'static,
    ) -> Result<Value> {
        let (proxy, _revoked) = self.make_proxy(target, Rc::new(traps))?;
        Ok(proxy)
    }

    pub fn proxy_revocable(
        &self,
        target: Value,
        traps: impl Traps + 'static,
    ) -> Result<RevocableProxy> {
        let (proxy, flag) = self.make_proxy(target, Rc::new(traps))?;
        Ok(RevocableProxy {
            proxy,
            revoke: Revoker { flag },
        })
    }

    fn presence(&self, shape: ObjectRef) -> Result<Value> {
        let (_, presence) =
            Deferred::with_presence(self.eventual.scheduler(), self.handler.clone(), |handler| {
                Value::exotic(Presence {
                    shape,
                    handler: handler.clone(),
                })
            })?;
        trace!("presence created");
        Ok(presence)
    }

    fn make_proxy(
        &self,
        target: Value,
        traps: Rc<dyn Traps>,
    ) -> Result<(Value, Rc<Cell<bool>>)> {
        let gate = TrapGate::disabled();
        let revoked = Rc::new(Cell::new(false));
        let proxy = Proxy {
            target,
            traps,
            handler: self.handler.clone(),
            gate: gate.clone(),
            revoked: Rc::clone(&revoked),
        };
        // Traps stay off while the presence machinery resolves the proxy.
        let _enable = gate.enable_on_drop();
        let (_, proxy) =
            Deferred::with_presence(self.eventual.scheduler(), self.handler.clone(), move |_| {
                Value::exotic(proxy)
            })?;
        Ok((proxy, revoked))
    }
}

impl fmt::Debug for DispatchFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchFactory")
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}
