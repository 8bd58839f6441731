// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Thin adapter over any execute function.
//!
//! Wraps a user-supplied `Fn(Task) -> bool` (a thread pool handle, an
//! event-loop spawner, a test harness) into a [`Scheduler`]. Returning
//! `false` from the function is the rejected sentinel. The serial-execution
//! requirement of `observe_on` is inherited from the wrapped executor: only
//! adapt single-threaded executors for that operator.

use freshet_core::{CancelFlag, CancelHandle, Scheduler, SchedulerRejected, Task};
use std::sync::Arc;

type ExecuteFn = dyn Fn(Task) -> bool + Send + Sync;

/// See the [module documentation](self).
pub struct ExecutorScheduler {
    execute: Arc<ExecuteFn>,
}

impl ExecutorScheduler {
    /// Adapt `execute`; it receives each task and returns `false` to refuse
    /// it.
    #[must_use]
    pub fn new(execute: impl Fn(Task) -> bool + Send + Sync + 'static) -> Self {
        Self {
            execute: Arc::new(execute),
        }
    }
}

impl Scheduler for ExecutorScheduler {
    fn schedule(&self, task: Task) -> Result<Arc<dyn CancelHandle>, SchedulerRejected> {
        let flag = Arc::new(CancelFlag::new());
        let guard = Arc::clone(&flag);
        let wrapped: Task = Box::new(move || {
            if !guard.is_cancelled() {
                task();
            }
        });
        if (self.execute)(wrapped) {
            Ok(flag)
        } else {
            Err(SchedulerRejected)
        }
    }
}
