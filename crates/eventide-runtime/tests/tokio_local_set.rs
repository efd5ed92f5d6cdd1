//! Driving pipelined cells from a tokio `LocalSet`.
#![cfg(feature = "tokio")]

use eventide_runtime::prelude::*;
use std::rc::Rc;
use tokio::task::LocalSet;

fn tools_on(local: &Rc<LocalSet>) -> DispatchTools {
    let powers = Powers::new(Scheduler::new(Rc::clone(local)));
    prepare_dispatch_tools(&Scope::new("tokio"), powers, &DispatchOptions::default()).unwrap()
}

#[tokio::test(flavor = "current_thread")]
async fn test_pipelined_call_on_local_set() {
    let local = Rc::new(LocalSet::new());
    let tools = tools_on(&local);
    let target = Value::object([(
        "greet",
        Value::function("greet", |_, args| {
            Ok(Value::from(format!("hello {}", arg(&args, 0))))
        }),
    )]);

    let greeting = tools
        .make_cell(target)
        .invoke("greet", vec![Value::from("tide")])
        .unwrap();
    let settled = tools.when(&greeting);

    let outcome = local.run_until(settled).await;
    assert_eq!(outcome, Ok(Value::from("hello tide")));
}

#[tokio::test(flavor = "current_thread")]
async fn test_rejection_on_local_set() {
    let local = Rc::new(LocalSet::new());
    let tools = tools_on(&local);
    let read = tools.eventual().get(&Value::Null, "missing");

    let outcome = local.run_until(read).await;
    assert!(outcome.unwrap_err().to_string().starts_with("TypeError"));
}
