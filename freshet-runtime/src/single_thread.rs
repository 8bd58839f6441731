// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Dedicated single-worker scheduler.
//!
//! All tasks run on one thread in submission order, which is exactly the
//! serial execution `observe_on` needs. Delayed and periodic tasks park in
//! a deadline heap; the worker sleeps on a condvar until the next deadline
//! or a new submission. Shutdown is the caller's responsibility and is
//! idempotent; pending tasks are dropped.

use freshet_core::{CancelFlag, CancelHandle, Scheduler, SchedulerRejected, Task, TimeScheduler};
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

enum TaskKind {
    Once(Task),
    Periodic(Box<dyn FnMut() + Send + 'static>, Duration),
}

struct Entry {
    kind: TaskKind,
    flag: Arc<CancelFlag>,
}

struct DelayedEntry {
    deadline: Instant,
    /// Submission tiebreak so equal deadlines stay FIFO.
    seq: u64,
    entry: Entry,
}

impl PartialEq for DelayedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for DelayedEntry {}

impl PartialOrd for DelayedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed: BinaryHeap is a max-heap, the earliest deadline must win
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct WorkerState {
    queue: VecDeque<Entry>,
    delayed: BinaryHeap<DelayedEntry>,
    seq: u64,
    shutdown: bool,
}

struct WorkerInner {
    state: Mutex<WorkerState>,
    condvar: Condvar,
}

/// See the [module documentation](self).
pub struct SingleThreadScheduler {
    inner: Arc<WorkerInner>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SingleThreadScheduler {
    /// Spawn the worker thread.
    #[must_use]
    pub fn new() -> Self {
        let inner = Arc::new(WorkerInner {
            state: Mutex::new(WorkerState {
                queue: VecDeque::new(),
                delayed: BinaryHeap::new(),
                seq: 0,
                shutdown: false,
            }),
            condvar: Condvar::new(),
        });
        let worker = Arc::clone(&inner);
        let handle = std::thread::Builder::new()
            .name("freshet-worker".into())
            .spawn(move || run_worker(&worker))
            .ok();
        Self {
            inner,
            handle: Mutex::new(handle),
        }
    }

    /// Stop the worker and drop all pending tasks. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock();
            state.shutdown = true;
            state.queue.clear();
            state.delayed.clear();
        }
        self.inner.condvar.notify_all();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn submit(&self, entry: Entry, delay: Option<Duration>) -> Result<(), SchedulerRejected> {
        let mut state = self.inner.state.lock();
        if state.shutdown {
            return Err(SchedulerRejected);
        }
        match delay {
            None => state.queue.push_back(entry),
            Some(delay) => {
                state.seq += 1;
                let seq = state.seq;
                state.delayed.push(DelayedEntry {
                    deadline: Instant::now() + delay,
                    seq,
                    entry,
                });
            }
        }
        drop(state);
        self.inner.condvar.notify_one();
        Ok(())
    }
}

impl Default for SingleThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SingleThreadScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Scheduler for SingleThreadScheduler {
    fn schedule(&self, task: Task) -> Result<Arc<dyn CancelHandle>, SchedulerRejected> {
        let flag = Arc::new(CancelFlag::new());
        self.submit(
            Entry {
                kind: TaskKind::Once(task),
                flag: Arc::clone(&flag),
            },
            None,
        )?;
        Ok(flag)
    }
}

impl TimeScheduler for SingleThreadScheduler {
    fn schedule_after(
        &self,
        task: Task,
        delay: Duration,
    ) -> Result<Arc<dyn CancelHandle>, SchedulerRejected> {
        let flag = Arc::new(CancelFlag::new());
        self.submit(
            Entry {
                kind: TaskKind::Once(task),
                flag: Arc::clone(&flag),
            },
            Some(delay),
        )?;
        Ok(flag)
    }

    fn schedule_periodic(
        &self,
        task: Box<dyn FnMut() + Send + 'static>,
        initial: Duration,
        period: Duration,
    ) -> Result<Arc<dyn CancelHandle>, SchedulerRejected> {
        let flag = Arc::new(CancelFlag::new());
        self.submit(
            Entry {
                kind: TaskKind::Periodic(task, period),
                flag: Arc::clone(&flag),
            },
            Some(initial),
        )?;
        Ok(flag)
    }
}

fn run_worker(inner: &WorkerInner) {
    loop {
        let entry = {
            let mut state = inner.state.lock();
            loop {
                if state.shutdown {
                    return;
                }
                let now = Instant::now();
                while state
                    .delayed
                    .peek()
                    .is_some_and(|delayed| delayed.deadline <= now)
                {
                    if let Some(due) = state.delayed.pop() {
                        state.queue.push_back(due.entry);
                    }
                }
                if let Some(entry) = state.queue.pop_front() {
                    break entry;
                }
                match state.delayed.peek().map(|delayed| delayed.deadline) {
                    Some(deadline) => {
                        let timeout = deadline.saturating_duration_since(Instant::now());
                        let _ = inner.condvar.wait_for(&mut state, timeout);
                    }
                    None => inner.condvar.wait(&mut state),
                }
            }
        };

        // Run outside the lock so tasks can re-schedule freely
        match entry.kind {
            TaskKind::Once(task) => {
                if !entry.flag.is_cancelled() {
                    task();
                }
            }
            TaskKind::Periodic(mut task, period) => {
                if entry.flag.is_cancelled() {
                    continue;
                }
                task();
                let mut state = inner.state.lock();
                if !state.shutdown && !entry.flag.is_cancelled() {
                    state.seq += 1;
                    let seq = state.seq;
                    state.delayed.push(DelayedEntry {
                        deadline: Instant::now() + period,
                        seq,
                        entry: Entry {
                            kind: TaskKind::Periodic(task, period),
                            flag: entry.flag,
                        },
                    });
                }
            }
        }
    }
}
