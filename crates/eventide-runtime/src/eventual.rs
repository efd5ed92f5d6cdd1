//! The eventual operation set.
//!
//! Every operation returns a fresh [`Deferred`] at once and does its work on
//! a later turn. Failures, including a target that cannot be adapted,
//! surface as rejections of the returned value, never as a synchronous
//! error.
//!
//! Dispatch order for the handled operations:
//!
//! 1. If the target is a pending deferred with a handler, or a presence,
//!    and that handler implements the operation, the handler runs.
//! 2. Otherwise the target is adapted through `when` and, once settled,
//!    the settled value's own handler gets a chance.
//! 3. Otherwise the ordinary operation runs on the settled value.

use crate::deferred::Deferred;
use crate::handler::{HandlerFn, Operation};
use crate::scheduler::Scheduler;
use crate::value::{Outcome, Value};
use eventide_core::prelude::{FailureTools, Key, OpKind};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Adapts an arbitrary value into a deferred that settles with it.
pub type WhenFn = Rc<dyn Fn(&Value) -> Deferred>;

/// Builds the raw value behind a step object.
pub type StepFn = Rc<dyn Fn(Value) -> Value>;

struct EventualInner {
    scheduler: Scheduler,
    failure: FailureTools,
    when: WhenFn,
    make_step: StepFn,
}

#[derive(Clone)]
pub struct Eventual {
    inner: Rc<EventualInner>,
}

impl Eventual {
    pub fn new(scheduler: Scheduler) -> Self {
        Self::with_powers(scheduler, FailureTools::default(), None, None)
    }

    pub fn with_powers(
        scheduler: Scheduler,
        failure: FailureTools,
        when: Option<WhenFn>,
        make_step: Option<StepFn>,
    ) -> Self {
        let when = when.unwrap_or_else(|| Self::default_when(&scheduler));
        let make_step: StepFn = match make_step {
            Some(make_step) => make_step,
            None => Rc::new(|resolution: Value| resolution),
        };
        Self {
            inner: Rc::new(EventualInner {
                scheduler,
                failure,
                when,
                make_step,
            }),
        }
    }

    /// Resolve the specimen into a fresh deferred whose rejection is never
    /// reported as unhandled.
    pub fn default_when(scheduler: &Scheduler) -> WhenFn {
        let scheduler = scheduler.clone();
        Rc::new(move |specimen: &Value| {
            let deferred = Deferred::resolved(&scheduler, specimen.clone());
            deferred.sink();
            deferred
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn failure(&self) -> &FailureTools {
        &self.inner.failure
    }

    pub fn when(&self, specimen: &Value) -> Deferred {
        (self.inner.when)(specimen)
    }

    pub fn get(&self, target: &Value, key: impl Into<Key>) -> Deferred {
        self.dispatch(target, Operation::Get { key: key.into() })
    }

    pub fn apply(&self, target: &Value, args: Vec<Value>) -> Deferred {
        self.dispatch(target, Operation::Apply { args })
    }

    /// Method call. Without a key this is exactly [`Eventual::apply`].
    pub fn send(&self, target: &Value, key: Option<Key>, args: Vec<Value>) -> Deferred {
        match key {
            Some(key) => self.dispatch(
                target,
                Operation::Send {
                    key: Some(key),
                    args,
                },
            ),
            None => self.apply(target, args),
        }
    }

    /// Fulfills with the assigned value.
    pub fn set(&self, target: &Value, key: impl Into<Key>, value: impl Into<Value>) -> Deferred {
        self.dispatch(
            target,
            Operation::Set {
                key: key.into(),
                value: value.into(),
            },
        )
    }

    /// Fulfills with whether the removal succeeded.
    pub fn delete(&self, target: &Value, key: impl Into<Key>) -> Deferred {
        self.dispatch(target, Operation::Delete { key: key.into() })
    }

    pub fn resolve(&self, value: impl Into<Value>) -> Deferred {
        Deferred::resolved(self.scheduler(), value)
    }

    pub fn reject(&self, reason: impl Into<Value>) -> Deferred {
        Deferred::rejected(self.scheduler(), reason)
    }

    pub fn make_step(&self, resolution: Value) -> Value {
        (self.inner.make_step)(resolution)
    }

    /// Issue `op` against `target`. The intercepting handler is chosen
    /// from the target's state at the moment of the call.
    pub fn dispatch(&self, target: &Value, op: Operation) -> Deferred {
        let kind = op.kind();
        let early = handler_for(target, kind);
        let this = self.clone();
        let target = target.clone();
        Deferred::spawn(self.scheduler(), async move {
            if let Some(handle) = early {
                trace!(op = %kind, "intercepted before settlement");
                return handle(&target, op);
            }
            let settled = match this.when(&target).await {
                Ok(settled) => settled,
                Err(reason) => return Err(reason),
            };
            if let Some(handle) = handler_for(&settled, kind) {
                trace!(op = %kind, "intercepted by presence");
                return handle(&settled, op);
            }
            trace!(op = %kind, "ordinary operation");
            perform(&settled, op)
        })
    }
}

impl fmt::Debug for Eventual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eventual")
            .field("scheduler", &self.inner.scheduler)
            .finish_non_exhaustive()
    }
}

fn handler_for(target: &Value, kind: OpKind) -> Option<HandlerFn> {
    let handler = match target {
        Value::Deferred(d) => d.handler()?,
        Value::Exotic(e) => e.eventual_handler()?,
        _ => return None,
    };
    handler.lookup(kind)
}

fn perform(target: &Value, op: Operation) -> Outcome {
    match op {
        Operation::Get { key } => target.get_with_receiver(&key, target),
        Operation::Set { key, value } => {
            target.set_with_receiver(&key, value.clone(), target)?;
            Ok(value)
        }
        Operation::Delete { key } => target.delete(key).map(Value::Bool),
        Operation::Apply { args } | Operation::Send { key: None, args } => {
            target.call(&Value::Undefined, args)
        }
        Operation::Send {
            key: Some(key),
            args,
        } => target.invoke(key, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::value::arg;
    use futures::executor::LocalPool;
    use std::cell::Cell;

    fn setup() -> (LocalPool, Eventual) {
        let pool = LocalPool::new();
        let eventual = Eventual::new(Scheduler::new(pool.spawner()));
        (pool, eventual)
    }

    fn counter() -> Value {
        let count = Rc::new(Cell::new(0));
        Value::object([
            ("count", Value::from(0)),
            (
                "bump",
                Value::function("bump", move |this, args| {
                    count.set(count.get() + 1);
                    let by = arg(&args, 0).as_number().unwrap_or(1.0);
                    let next = this.get("count")?.as_number().unwrap_or(0.0) + by;
                    this.set("count", next)?;
                    Ok(Value::from(next))
                }),
            ),
        ])
    }

    #[test]
    fn test_get_is_asynchronous() {
        let (mut pool, eventual) = setup();
        let target = Value::object([("a", 1)]);
        let read = eventual.get(&target, "a");
        assert!(!read.is_settled());
        assert_eq!(pool.run_until(read), Ok(Value::from(1)));
    }

    #[test]
    fn test_operations_on_deferred_target() {
        let (mut pool, eventual) = setup();
        let target = Value::Deferred(eventual.resolve(counter()));

        let bumped = eventual.send(&target, Some(Key::from("bump")), vec![Value::from(5)]);
        assert_eq!(pool.run_until(bumped), Ok(Value::from(5)));

        let assigned = eventual.set(&target, "extra", "yes");
        assert_eq!(pool.run_until(assigned), Ok(Value::from("yes")));

        let removed = eventual.delete(&target, "extra");
        assert_eq!(pool.run_until(removed), Ok(Value::Bool(true)));

        let gone = eventual.get(&target, "extra");
        assert_eq!(pool.run_until(gone), Ok(Value::Undefined));
    }

    #[test]
    fn test_send_without_key_is_apply() {
        let (mut pool, eventual) = setup();
        let f = Value::function("f", |this, args| {
            Ok(Value::from(this.is_undefined() && args.len() == 2))
        });
        let via_send = eventual.send(&f, None, vec![Value::Null, Value::Null]);
        let via_apply = eventual.apply(&f, vec![Value::Null, Value::Null]);
        assert_eq!(pool.run_until(via_send), Ok(Value::from(true)));
        assert_eq!(pool.run_until(via_apply), Ok(Value::from(true)));
    }

    #[test]
    fn test_failures_become_rejections() {
        let (mut pool, eventual) = setup();
        let read = eventual.get(&Value::Undefined, "a");
        let reason = pool.run_until(read).unwrap_err();
        assert!(reason.to_string().starts_with("TypeError"));

        let call = eventual.apply(&Value::from(3), vec![]);
        assert!(pool.run_until(call).is_err());

        let rejected = Value::Deferred(eventual.reject("upstream"));
        let downstream = eventual.get(&rejected, "a");
        assert_eq!(pool.run_until(downstream), Err(Value::from("upstream")));
    }

    #[test]
    fn test_handler_intercepts_pending_target() {
        let (mut pool, eventual) = setup();
        let seen = Rc::new(Cell::new(0));
        let hits = Rc::clone(&seen);
        let handler = Handler::builder()
            .on_get(move |_, key| {
                hits.set(hits.get() + 1);
                Ok(Value::from(format!("handled {}", key)))
            })
            .build();
        let (pending, _resolver) = Deferred::pending_with_handler(eventual.scheduler(), handler);

        let read = eventual.get(&Value::Deferred(pending.clone()), "k");
        assert_eq!(pool.run_until(read), Ok(Value::from("handled k")));
        assert_eq!(seen.get(), 1);

        // Operations the handler lacks wait for settlement.
        let call = eventual.apply(&Value::Deferred(pending), vec![]);
        pool.run_until_stalled();
        assert!(!call.is_settled());
    }

    #[test]
    fn test_custom_when_is_consulted() {
        let mut pool = LocalPool::new();
        let scheduler = Scheduler::new(pool.spawner());
        let calls = Rc::new(Cell::new(0));
        let counted = Rc::clone(&calls);
        let inner = Eventual::default_when(&scheduler);
        let when: WhenFn = Rc::new(move |v: &Value| {
            counted.set(counted.get() + 1);
            inner(v)
        });
        let eventual = Eventual::with_powers(scheduler, FailureTools::default(), Some(when), None);

        let read = eventual.get(&Value::object([("a", 2)]), "a");
        assert_eq!(pool.run_until(read), Ok(Value::from(2)));
        assert_eq!(calls.get(), 1);
        assert_eq!(eventual.make_step(Value::from(9)), Value::from(9));
    }
}
