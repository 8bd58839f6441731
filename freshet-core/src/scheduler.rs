// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Executor abstraction for async-boundary operators.
//!
//! The library never spawns threads on its own: operators that cross an
//! async boundary are handed a [`Scheduler`], and time-based sources a
//! [`TimeScheduler`]. Implementations live in `freshet-runtime`; anything
//! that can run a boxed closure can be adapted.
//!
//! `observe_on` relies on the scheduler executing its tasks serially (a
//! single worker or an equivalent serial executor); the drain loop itself
//! guarantees only one task is pending at a time.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A unit of work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Returned when a scheduler refuses work, typically after shutdown.
///
/// The caller must terminate its stream with a rejected-execution error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerRejected;

impl fmt::Display for SchedulerRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scheduler rejected the task")
    }
}

impl std::error::Error for SchedulerRejected {}

/// Handle to a scheduled task.
pub trait CancelHandle: Send + Sync {
    /// Cancel the task if it has not run yet. Idempotent.
    fn cancel(&self);
}

/// Accepts units of work for execution on some worker.
pub trait Scheduler: Send + Sync {
    /// Enqueue `task` for execution.
    ///
    /// # Errors
    /// Returns [`SchedulerRejected`] if the scheduler refuses work; the
    /// caller must error its stream.
    fn schedule(&self, task: Task) -> Result<Arc<dyn CancelHandle>, SchedulerRejected>;
}

/// A scheduler that can additionally run work after a delay.
pub trait TimeScheduler: Scheduler {
    /// Run `task` once after `delay`.
    ///
    /// # Errors
    /// Returns [`SchedulerRejected`] if the scheduler refuses work.
    fn schedule_after(
        &self,
        task: Task,
        delay: Duration,
    ) -> Result<Arc<dyn CancelHandle>, SchedulerRejected>;

    /// Run `task` after `initial`, then repeatedly every `period`.
    ///
    /// # Errors
    /// Returns [`SchedulerRejected`] if the scheduler refuses work.
    fn schedule_periodic(
        &self,
        task: Box<dyn FnMut() + Send + 'static>,
        initial: Duration,
        period: Duration,
    ) -> Result<Arc<dyn CancelHandle>, SchedulerRejected>;
}

/// Shared cancelled flag implementing [`CancelHandle`].
///
/// Schedulers pair each task with one of these; the worker skips the task if
/// the flag was raised first.
#[derive(Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
}

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl CancelHandle for CancelFlag {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

enum TaskSlotState {
    Empty,
    Installed(Arc<dyn CancelHandle>),
    Cancelled,
}

/// Install-or-cancel slot for a scheduled task's cancel handle.
///
/// Subscribing a time-based source races the scheduler against a concurrent
/// `cancel()`: the handle may not exist yet when the cancel arrives. The
/// slot resolves the race with three states (empty, installed, cancelled)
/// and guarantees the handle's `cancel` runs at most once.
pub struct TaskSlot {
    state: Mutex<TaskSlotState>,
}

impl TaskSlot {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TaskSlotState::Empty),
        }
    }

    /// Install the handle of the just-scheduled task.
    ///
    /// If the slot was already cancelled, the handle is cancelled instead of
    /// installed.
    pub fn install(&self, handle: Arc<dyn CancelHandle>) {
        let cancelled = {
            let mut state = self.state.lock();
            match &*state {
                TaskSlotState::Cancelled => true,
                _ => {
                    *state = TaskSlotState::Installed(Arc::clone(&handle));
                    false
                }
            }
        };
        if cancelled {
            handle.cancel();
        }
    }

    /// Cancel the slot and any installed handle. Idempotent.
    pub fn cancel(&self) {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, TaskSlotState::Cancelled)
        };
        if let TaskSlotState::Installed(handle) = previous {
            handle.cancel();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(&*self.state.lock(), TaskSlotState::Cancelled)
    }
}

impl Default for TaskSlot {
    fn default() -> Self {
        Self::new()
    }
}
