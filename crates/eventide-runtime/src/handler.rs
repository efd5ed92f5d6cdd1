//! Handlers intercept eventual operations aimed at a deferred value or
//! a presence.

use crate::value::{type_error, Outcome, Value};
use eventide_core::prelude::{Key, OpKind};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// One eventual operation together with its payload.
#[derive(Debug, Clone)]
pub enum Operation {
    Get { key: Key },
    Set { key: Key, value: Value },
    Delete { key: Key },
    Apply { args: Vec<Value> },
    Send { key: Option<Key>, args: Vec<Value> },
}

impl Operation {
    pub fn kind(&self) -> OpKind {
        match self {
            Operation::Get { .. } => OpKind::Get,
            Operation::Set { .. } => OpKind::Set,
            Operation::Delete { .. } => OpKind::Delete,
            Operation::Apply { .. } => OpKind::Apply,
            Operation::Send { .. } => OpKind::Send,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Get { key } | Operation::Delete { key } | Operation::Set { key, .. } => {
                write!(f, "{} {}", self.kind(), key)
            }
            Operation::Apply { args } => write!(f, "{}({} args)", self.kind(), args.len()),
            Operation::Send { key: Some(key), args } => {
                write!(f, "{} {}({} args)", self.kind(), key, args.len())
            }
            Operation::Send { key: None, args } => {
                write!(f, "{}({} args)", self.kind(), args.len())
            }
        }
    }
}

/// A single intercepting operation. The first argument is the value the
/// operation was aimed at.
pub type HandlerFn = Rc<dyn Fn(&Value, Operation) -> Outcome>;

/// A possibly partial set of intercepting operations.
#[derive(Clone, Default)]
pub struct Handler {
    ops: Rc<HashMap<OpKind, HandlerFn>>,
}

impl Handler {
    pub fn builder() -> HandlerBuilder {
        HandlerBuilder::default()
    }

    /// A handler whose every operation quietly yields `undefined`.
    pub fn inert() -> Handler {
        let mut builder = Handler::builder();
        for kind in OpKind::HANDLED {
            builder = builder.on(kind, |_, _| Ok(Value::Undefined));
        }
        builder.build()
    }

    pub fn lookup(&self, kind: OpKind) -> Option<HandlerFn> {
        self.ops.get(&kind).cloned()
    }

    pub fn implements(&self, kind: OpKind) -> bool {
        self.ops.contains_key(&kind)
    }

    /// Implemented operations, in [`OpKind::HANDLED`] order.
    pub fn kinds(&self) -> Vec<OpKind> {
        OpKind::HANDLED
            .into_iter()
            .filter(|kind| self.implements(*kind))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Rc::ptr_eq(&self.ops, &other.ops)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("ops", &self.kinds()).finish()
    }
}

fn mismatched(expected: OpKind, op: &Operation) -> Value {
    type_error(format!("{} handler received {}", expected, op))
}

#[derive(Default)]
pub struct HandlerBuilder {
    ops: HashMap<OpKind, HandlerFn>,
}

impl HandlerBuilder {
    /// Register a raw operation. Only kinds in [`OpKind::HANDLED`] are
    /// ever consulted.
    pub fn on(mut self, kind: OpKind, f: impl Fn(&Value, Operation) -> Outcome + 'static) -> Self {
        self.ops.insert(kind, Rc::new(f));
        self
    }

    pub fn insert(mut self, kind: OpKind, f: HandlerFn) -> Self {
        self.ops.insert(kind, f);
        self
    }

    pub fn on_get(self, f: impl Fn(&Value, &Key) -> Outcome + 'static) -> Self {
        self.on(OpKind::Get, move |target, op| match op {
            Operation::Get { key } => f(target, &key),
            other => Err(mismatched(OpKind::Get, &other)),
        })
    }

    pub fn on_set(self, f: impl Fn(&Value, &Key, Value) -> Outcome + 'static) -> Self {
        self.on(OpKind::Set, move |target, op| match op {
            Operation::Set { key, value } => f(target, &key, value),
            other => Err(mismatched(OpKind::Set, &other)),
        })
    }

    pub fn on_delete(self, f: impl Fn(&Value, &Key) -> Outcome + 'static) -> Self {
        self.on(OpKind::Delete, move |target, op| match op {
            Operation::Delete { key } => f(target, &key),
            other => Err(mismatched(OpKind::Delete, &other)),
        })
    }

    pub fn on_apply(self, f: impl Fn(&Value, Vec<Value>) -> Outcome + 'static) -> Self {
        self.on(OpKind::Apply, move |target, op| match op {
            Operation::Apply { args } => f(target, args),
            other => Err(mismatched(OpKind::Apply, &other)),
        })
    }

    pub fn on_send(
        self,
        f: impl Fn(&Value, Option<&Key>, Vec<Value>) -> Outcome + 'static,
    ) -> Self {
        self.on(OpKind::Send, move |target, op| match op {
            Operation::Send { key, args } => f(target, key.as_ref(), args),
            other => Err(mismatched(OpKind::Send, &other)),
        })
    }

    pub fn build(self) -> Handler {
        Handler {
            ops: Rc::new(self.ops),
        }
    }
}
