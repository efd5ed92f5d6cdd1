//! The single-threaded scheduling seam.
//!
//! Every continuation in eventide runs as a task on a [`Scheduler`]. The
//! scheduler is always handed in explicitly; nothing looks up an ambient
//! executor. Any `!Send` executor can back it by implementing [`Spawner`].
//!
//! # Example
//!
//! ```rust
//! use eventide_runtime::scheduler::Scheduler;
//! use futures::executor::LocalPool;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut pool = LocalPool::new();
//! let scheduler = Scheduler::new(pool.spawner());
//!
//! let ran = Rc::new(Cell::new(false));
//! let flag = Rc::clone(&ran);
//! scheduler.spawn(async move { flag.set(true) });
//!
//! assert!(!ran.get());
//! pool.run_until_stalled();
//! assert!(ran.get());
//! ```

use futures::executor::LocalSpawner;
use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tracing::warn;

/// Something that can run `!Send` tasks on the current thread.
pub trait Spawner {
    fn spawn_boxed(&self, task: LocalBoxFuture<'static, ()>);
}

impl Spawner for LocalSpawner {
    fn spawn_boxed(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(err) = LocalSpawnExt::spawn_local(self, task) {
            warn!(%err, "executor refused task; it has shut down");
        }
    }
}

impl<S: Spawner + ?Sized> Spawner for Rc<S> {
    fn spawn_boxed(&self, task: LocalBoxFuture<'static, ()>) {
        (**self).spawn_boxed(task)
    }
}

#[cfg(feature = "tokio")]
impl Spawner for tokio::task::LocalSet {
    fn spawn_boxed(&self, task: LocalBoxFuture<'static, ()>) {
        // Dropping the JoinHandle detaches the task.
        drop(self.spawn_local(task));
    }
}

/// Cheap, clonable handle to the executor that runs continuations.
#[derive(Clone)]
pub struct Scheduler {
    spawner: Rc<dyn Spawner>,
}

impl Scheduler {
    pub fn new(spawner: impl Spawner + 'static) -> Self {
        Self {
            spawner: Rc::new(spawner),
        }
    }

    /// Queue a task. It runs on a later turn, never inline.
    pub fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        self.spawner.spawn_boxed(task.boxed_local());
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}
