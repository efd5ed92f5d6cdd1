//! Reporting of rejections nobody observed.

use eventide_runtime::prelude::*;
use futures::executor::LocalPool;
use std::sync::{Arc, Mutex};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Collects events on the `eventide::unhandled` target.
#[derive(Clone, Default)]
struct Unhandled(Arc<Mutex<Vec<String>>>);

impl<S: Subscriber> Layer<S> for Unhandled {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() == "eventide::unhandled" {
            self.0
                .lock()
                .unwrap()
                .push(event.metadata().level().to_string());
        }
    }
}

/// Run `body` with a capturing subscriber and return how many reports it saw.
fn reports_during(body: impl FnOnce(&mut LocalPool, &Scheduler)) -> usize {
    let captured = Unhandled::default();
    let subscriber = tracing_subscriber::registry().with(captured.clone());
    tracing::subscriber::with_default(subscriber, || {
        let mut pool = LocalPool::new();
        let scheduler = Scheduler::new(pool.spawner());
        body(&mut pool, &scheduler);
        pool.run_until_stalled();
    });
    let count = captured.0.lock().unwrap().len();
    count
}

#[test]
fn test_dropped_rejection_is_reported() {
    let count = reports_during(|pool, scheduler| {
        let rejected = Deferred::rejected(scheduler, "nobody looked");
        pool.run_until_stalled();
        drop(rejected);
    });
    assert_eq!(count, 1);
}

#[test]
fn test_awaited_rejection_is_not_reported() {
    let count = reports_during(|pool, scheduler| {
        let rejected = Deferred::rejected(scheduler, "seen");
        assert_eq!(pool.run_until(rejected.clone()), Err(Value::from("seen")));
        drop(rejected);
    });
    assert_eq!(count, 0);
}

#[test]
fn test_sunk_rejection_is_not_reported() {
    let count = reports_during(|pool, scheduler| {
        let rejected = Deferred::rejected(scheduler, "ignored on purpose");
        rejected.sink();
        pool.run_until_stalled();
        drop(rejected);
    });
    assert_eq!(count, 0);
}

#[test]
fn test_fulfilled_value_is_never_reported() {
    let count = reports_during(|pool, scheduler| {
        let fulfilled = Deferred::resolved(scheduler, 1);
        pool.run_until_stalled();
        drop(fulfilled);
    });
    assert_eq!(count, 0);
}

#[test]
fn test_cell_set_with_foreign_receiver_is_reported() {
    let count = reports_during(|pool, scheduler| {
        let powers = Powers::new(scheduler.clone());
        let tools =
            prepare_dispatch_tools(&Scope::default(), powers, &DispatchOptions::default()).unwrap();
        let cell = tools.make_cell(Value::object([("x", 1)]));

        let accepted = cell
            .set_with_receiver(&Key::from("x"), Value::from(2), &Value::Null)
            .unwrap();
        assert!(!accepted);
        pool.run_until_stalled();
    });
    assert_eq!(count, 1);
}
