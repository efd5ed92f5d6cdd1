//! Deferred values: placeholders for results that arrive later.
//!
//! A [`Deferred`] starts pending and settles exactly once, either fulfilled
//! with a value or rejected with a reason. While pending it may carry a
//! [`Handler`]; eventual operations issued against it during that window
//! are routed to the handler instead of waiting for settlement.
//!
//! A `Deferred` is a [`Future`] whose output is the settled [`Outcome`].
//! Continuations are always queued on the [`Scheduler`], never run
//! inline, so observers never see a value settle under their feet.
//!
//! A rejection nobody observed is reported through `tracing` on the
//! `eventide::unhandled` target when the last handle goes away.

use crate::handler::Handler;
use crate::scheduler::Scheduler;
use crate::value::{arg, type_error, Outcome, Value};
use eventide_core::prelude::{DeferredId, EventideError, Key, OpKind};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};
use tracing::{trace, warn};

enum State {
    Pending {
        handler: Option<Handler>,
        waiters: Vec<Waker>,
    },
    Settled(Outcome),
}

struct Inner {
    id: DeferredId,
    scheduler: Scheduler,
    state: RefCell<State>,
    observed: Cell<bool>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.observed.get() {
            return;
        }
        if let State::Settled(Err(reason)) = self.state.get_mut() {
            warn!(
                target: "eventide::unhandled",
                deferred = %self.id,
                reason = %reason,
                "rejection was never observed"
            );
        }
    }
}

#[derive(Clone)]
pub struct Deferred {
    inner: Rc<Inner>,
}

impl Deferred {
    fn create(scheduler: &Scheduler, handler: Option<Handler>) -> Self {
        Self {
            inner: Rc::new(Inner {
                id: DeferredId::new(),
                scheduler: scheduler.clone(),
                state: RefCell::new(State::Pending {
                    handler,
                    waiters: Vec::new(),
                }),
                observed: Cell::new(false),
            }),
        }
    }

    pub fn pending(scheduler: &Scheduler) -> (Deferred, Resolver) {
        let deferred = Self::create(scheduler, None);
        let resolver = Resolver::new(deferred.clone());
        (deferred, resolver)
    }

    /// A pending value whose eventual operations go to `handler` until
    /// it settles.
    pub fn pending_with_handler(scheduler: &Scheduler, handler: Handler) -> (Deferred, Resolver) {
        let deferred = Self::create(scheduler, Some(handler));
        let resolver = Resolver::new(deferred.clone());
        (deferred, resolver)
    }

    pub fn resolved(scheduler: &Scheduler, value: impl Into<Value>) -> Deferred {
        let (deferred, resolver) = Self::pending(scheduler);
        resolver.resolve(value.into());
        deferred
    }

    pub fn rejected(scheduler: &Scheduler, reason: impl Into<Value>) -> Deferred {
        let (deferred, resolver) = Self::pending(scheduler);
        resolver.reject(reason.into());
        deferred
    }

    /// Resolved-immediately construction. The value stays handled until
    /// the scheduler's next turn settles it with `value`.
    pub fn with_handler(scheduler: &Scheduler, value: Value, handler: Handler) -> Deferred {
        let (deferred, resolver) = Self::pending_with_handler(scheduler, handler);
        scheduler.spawn(async move { resolver.resolve(value) });
        deferred
    }

    /// Presence construction. The handler must implement `get`; `build`
    /// makes the presence, which the returned value is settled with.
    pub fn with_presence(
        scheduler: &Scheduler,
        handler: Handler,
        build: impl FnOnce(&Handler) -> Value,
    ) -> Result<(Deferred, Value), EventideError> {
        if !handler.implements(OpKind::Get) {
            return Err(EventideError::MissingCapability(OpKind::Get));
        }
        let presence = build(&handler);
        let (deferred, resolver) = Self::pending_with_handler(scheduler, handler);
        resolver.resolve(presence.clone());
        Ok((deferred, presence))
    }

    /// Run `future` on the scheduler and settle with its outcome.
    pub fn spawn<F>(scheduler: &Scheduler, future: F) -> Deferred
    where
        F: Future<Output = Outcome> + 'static,
    {
        let (deferred, resolver) = Self::pending(scheduler);
        scheduler.spawn(async move {
            match future.await {
                Ok(value) => resolver.resolve(value),
                Err(reason) => resolver.reject(reason),
            }
        });
        deferred
    }

    pub fn id(&self) -> DeferredId {
        self.inner.id
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// The handler, while one is attached and the value is pending.
    pub fn handler(&self) -> Option<Handler> {
        match &*self.inner.state.borrow() {
            State::Pending { handler, .. } => handler.clone(),
            State::Settled(_) => None,
        }
    }

    pub fn peek(&self) -> Option<Outcome> {
        match &*self.inner.state.borrow() {
            State::Settled(outcome) => Some(outcome.clone()),
            State::Pending { .. } => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(&*self.inner.state.borrow(), State::Settled(_))
    }

    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakDeferred {
        WeakDeferred(Rc::downgrade(&self.inner))
    }

    /// Mark the value observed so its rejection is not reported.
    pub fn sink(&self) -> &Self {
        self.inner.observed.set(true);
        self
    }

    pub fn then(&self, on_fulfilled: Value, on_rejected: Value) -> Deferred {
        let source = self.clone();
        source.sink();
        Deferred::spawn(self.scheduler(), async move {
            match source.await {
                Ok(value) if on_fulfilled.is_callable() => {
                    on_fulfilled.call(&Value::Undefined, vec![value])
                }
                Err(reason) if on_rejected.is_callable() => {
                    on_rejected.call(&Value::Undefined, vec![reason])
                }
                outcome => outcome,
            }
        })
    }

    pub fn catch(&self, on_rejected: Value) -> Deferred {
        self.then(Value::Undefined, on_rejected)
    }

    /// Run `on_finally` after settlement, then pass the outcome through.
    /// A throw or rejection from `on_finally` replaces it.
    pub fn finally(&self, on_finally: Value) -> Deferred {
        let source = self.clone();
        source.sink();
        Deferred::spawn(self.scheduler(), async move {
            let outcome = source.await;
            if on_finally.is_callable() {
                match on_finally.call(&Value::Undefined, Vec::new()) {
                    Err(reason) => return Err(reason),
                    Ok(Value::Deferred(wait)) => {
                        if let Err(reason) = wait.await {
                            return Err(reason);
                        }
                    }
                    Ok(_) => {}
                }
            }
            outcome
        })
    }

    /// `then`, `catch` or `finally` bound to this value.
    pub fn method(&self, name: &str) -> Option<Value> {
        let me = self.clone();
        let method = match name {
            "then" => Value::function("then", move |_, args| {
                Ok(Value::Deferred(me.then(arg(&args, 0), arg(&args, 1))))
            }),
            "catch" => Value::function("catch", move |_, args| {
                Ok(Value::Deferred(me.catch(arg(&args, 0))))
            }),
            "finally" => Value::function("finally", move |_, args| {
                Ok(Value::Deferred(me.finally(arg(&args, 0))))
            }),
            _ => return None,
        };
        Some(method)
    }

    fn settle(&self, outcome: Outcome) {
        let waiters = {
            let mut state = self.inner.state.borrow_mut();
            match &mut *state {
                State::Settled(_) => return,
                State::Pending { waiters, .. } => {
                    let waiters = std::mem::take(waiters);
                    *state = State::Settled(outcome);
                    waiters
                }
            }
        };
        trace!(deferred = %self.inner.id, "settled");
        for waker in waiters {
            waker.wake();
        }
    }

    /// Follow `value`: adopt another deferred, assimilate a thenable, or
    /// fulfill directly.
    fn adopt(&self, value: Value) {
        match value {
            Value::Deferred(other) if other.ptr_eq(self) => {
                self.settle(Err(type_error("Chaining cycle detected for deferred value")));
            }
            Value::Deferred(other) => {
                other.sink();
                let me = self.clone();
                self.scheduler().spawn(async move {
                    let outcome = other.await;
                    me.settle(outcome);
                });
            }
            Value::Object(_) | Value::Function(_) | Value::Exotic(_) => {
                let then = match value.get_with_receiver(&Key::from("then"), &value) {
                    Ok(then) => then,
                    Err(reason) => return self.settle(Err(reason)),
                };
                if !then.is_callable() {
                    return self.settle(Ok(value));
                }
                let resolver = Resolver::new(self.clone());
                self.scheduler().spawn(async move {
                    let (on_resolve, on_reject) = resolver.functions();
                    if let Err(reason) = then.call(&value, vec![on_resolve, on_reject]) {
                        resolver.reject(reason);
                    }
                });
            }
            other => self.settle(Ok(other)),
        }
    }
}

impl Future for Deferred {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Outcome> {
        self.inner.observed.set(true);
        let mut state = self.inner.state.borrow_mut();
        match &mut *state {
            State::Settled(outcome) => Poll::Ready(outcome.clone()),
            State::Pending { waiters, .. } => {
                if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
                    waiters.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.state.borrow() {
            State::Pending { handler: Some(_), .. } => "handled",
            State::Pending { handler: None, .. } => "pending",
            State::Settled(Ok(_)) => "fulfilled",
            State::Settled(Err(_)) => "rejected",
        };
        write!(f, "Deferred({}, {})", self.inner.id, state)
    }
}

#[derive(Clone)]
pub struct WeakDeferred(Weak<Inner>);

impl WeakDeferred {
    pub fn is(&self, deferred: &Deferred) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&deferred.inner))
    }

    pub fn upgrade(&self) -> Option<Deferred> {
        self.0.upgrade().map(|inner| Deferred { inner })
    }
}

/// The settling half of a pending [`Deferred`]. Clones share one
/// "already resolved" flag, so only the first call has any effect.
#[derive(Clone)]
pub struct Resolver {
    target: Deferred,
    done: Rc<Cell<bool>>,
}

impl Resolver {
    fn new(target: Deferred) -> Self {
        Self {
            target,
            done: Rc::new(Cell::new(false)),
        }
    }

    pub fn resolve(&self, value: Value) {
        if self.done.replace(true) {
            return;
        }
        self.target.adopt(value);
    }

    pub fn reject(&self, reason: Value) {
        if self.done.replace(true) {
            return;
        }
        self.target.settle(Err(reason));
    }

    pub fn is_done(&self) -> bool {
        self.done.get()
    }

    pub fn deferred(&self) -> &Deferred {
        &self.target
    }

    fn functions(&self) -> (Value, Value) {
        let on_resolve = self.clone();
        let on_reject = self.clone();
        (
            Value::function("resolve", move |_, args| {
                on_resolve.resolve(arg(&args, 0));
                Ok(Value::Undefined)
            }),
            Value::function("reject", move |_, args| {
                on_reject.reject(arg(&args, 0));
                Ok(Value::Undefined)
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventide_core::prelude::TaggedError;
    use futures::executor::LocalPool;

    fn setup() -> (LocalPool, Scheduler) {
        let pool = LocalPool::new();
        let scheduler = Scheduler::new(pool.spawner());
        (pool, scheduler)
    }

    #[test]
    fn test_resolve_and_await() {
        let (mut pool, scheduler) = setup();
        let (deferred, resolver) = Deferred::pending(&scheduler);
        assert!(!deferred.is_settled());

        resolver.resolve(Value::from(7));
        resolver.resolve(Value::from(8));
        resolver.reject(Value::from("late"));

        assert_eq!(pool.run_until(deferred), Ok(Value::from(7)));
    }

    #[test]
    fn test_adopts_other_deferred() {
        let (mut pool, scheduler) = setup();
        let (inner, inner_resolver) = Deferred::pending(&scheduler);
        let outer = Deferred::resolved(&scheduler, inner);
        assert!(!outer.is_settled());

        inner_resolver.reject(Value::from("boom"));
        assert_eq!(pool.run_until(outer), Err(Value::from("boom")));
    }

    #[test]
    fn test_self_resolution_is_a_cycle() {
        let (_pool, scheduler) = setup();
        let (deferred, resolver) = Deferred::pending(&scheduler);
        resolver.resolve(Value::Deferred(deferred.clone()));

        let reason = deferred.peek().unwrap().unwrap_err();
        assert!(reason.to_string().contains("Chaining cycle"));
    }

    #[test]
    fn test_assimilates_thenable() {
        let (mut pool, scheduler) = setup();
        let thenable = Value::object([(
            "then",
            Value::function("then", |_, args| {
                arg(&args, 0).call(&Value::Undefined, vec![Value::from("assimilated")])
            }),
        )]);
        let deferred = Deferred::resolved(&scheduler, thenable);
        assert_eq!(pool.run_until(deferred), Ok(Value::from("assimilated")));
    }

    #[test]
    fn test_throwing_thenable_rejects() {
        let (mut pool, scheduler) = setup();
        let thenable = Value::object([(
            "then",
            Value::function("then", |_, _| Err(Value::from("thrown"))),
        )]);
        let deferred = Deferred::resolved(&scheduler, thenable);
        assert_eq!(pool.run_until(deferred), Err(Value::from("thrown")));
    }

    #[test]
    fn test_then_catch_finally() {
        let (mut pool, scheduler) = setup();
        let doubled = Deferred::resolved(&scheduler, 21).then(
            Value::function("double", |_, args| {
                Ok(Value::from(arg(&args, 0).as_number().unwrap_or(0.0) * 2.0))
            }),
            Value::Undefined,
        );
        assert_eq!(pool.run_until(doubled), Ok(Value::from(42)));

        let recovered = Deferred::rejected(&scheduler, "bad")
            .catch(Value::function("recover", |_, _| Ok(Value::from("fine"))));
        assert_eq!(pool.run_until(recovered), Ok(Value::from("fine")));

        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let passed = Deferred::resolved(&scheduler, "kept").finally(Value::function(
            "cleanup",
            move |_, _| {
                flag.set(true);
                Ok(Value::from("ignored"))
            },
        ));
        assert_eq!(pool.run_until(passed), Ok(Value::from("kept")));
        assert!(ran.get());
    }

    #[test]
    fn test_then_passes_through_without_callbacks() {
        let (mut pool, scheduler) = setup();
        let chained = Deferred::rejected(&scheduler, "reason").then(Value::Undefined, Value::Undefined);
        assert_eq!(pool.run_until(chained), Err(Value::from("reason")));
    }

    #[test]
    fn test_handler_visible_until_settled() {
        let (mut pool, scheduler) = setup();
        let handler = Handler::builder().on_get(|_, _| Ok(Value::Null)).build();
        let deferred = Deferred::with_handler(&scheduler, Value::from(1), handler);

        assert!(deferred.handler().is_some());
        pool.run_until_stalled();
        assert!(deferred.handler().is_none());
        assert_eq!(deferred.peek(), Some(Ok(Value::from(1))));
    }

    #[test]
    fn test_presence_requires_get() {
        let (_pool, scheduler) = setup();
        let handler = Handler::builder().on_apply(|_, _| Ok(Value::Null)).build();
        let result = Deferred::with_presence(&scheduler, handler, |_| Value::empty_object());
        assert!(matches!(
            result,
            Err(EventideError::MissingCapability(OpKind::Get))
        ));
    }

    #[test]
    fn test_presence_settles_with_presence() {
        let (_pool, scheduler) = setup();
        let handler = Handler::builder().on_get(|_, _| Ok(Value::Null)).build();
        let (deferred, presence) =
            Deferred::with_presence(&scheduler, handler, |_| Value::empty_object()).unwrap();
        assert_eq!(deferred.peek(), Some(Ok(presence)));
    }

    #[test]
    fn test_method_lookup_through_value() {
        let (mut pool, scheduler) = setup();
        let deferred = Value::Deferred(Deferred::resolved(&scheduler, 5));
        let then = deferred.get("then").unwrap();
        assert!(then.is_callable());
        assert!(deferred.get("other").unwrap().is_undefined());

        let next = then
            .call(&deferred, vec![Value::function("id", |_, args| Ok(arg(&args, 0)))])
            .unwrap();
        let next = next.as_deferred().cloned().unwrap();
        assert_eq!(pool.run_until(next), Ok(Value::from(5)));
    }

    #[test]
    fn test_spawned_future_settles() {
        let (mut pool, scheduler) = setup();
        let deferred = Deferred::spawn(&scheduler, async {
            Err(Value::from(TaggedError::type_error("from task")))
        });
        let reason = pool.run_until(deferred).unwrap_err();
        assert_eq!(reason.to_string(), "TypeError: from task");
    }
}
