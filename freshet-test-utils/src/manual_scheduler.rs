// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Deterministic scheduler driven by the test.
//!
//! Nothing runs until the test calls [`run_all`](ManualScheduler::run_all)
//! or advances the virtual clock, so scheduling races disappear from the
//! assertions. Tasks run on the calling thread, which also satisfies the
//! serial-execution requirement of `observe_on`.

use freshet_core::{CancelFlag, CancelHandle, Scheduler, SchedulerRejected, Task, TimeScheduler};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

enum ManualTask {
    Once(Task),
    Periodic(Box<dyn FnMut() + Send + 'static>, Duration),
}

struct ManualEntry {
    task: ManualTask,
    flag: Arc<CancelFlag>,
}

struct DelayedManual {
    due: Duration,
    seq: u64,
    entry: ManualEntry,
}

struct ManualState {
    queue: VecDeque<ManualEntry>,
    delayed: Vec<DelayedManual>,
    now: Duration,
    seq: u64,
    reject: bool,
}

/// See the [module documentation](self).
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ManualState {
                queue: VecDeque::new(),
                delayed: Vec::new(),
                now: Duration::ZERO,
                seq: 0,
                reject: false,
            }),
        })
    }

    /// Make every further submission fail with the rejected sentinel.
    pub fn set_reject(&self, reject: bool) {
        self.state.lock().reject = reject;
    }

    /// Number of immediately-runnable tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Number of tasks parked on the virtual clock.
    #[must_use]
    pub fn pending_delayed(&self) -> usize {
        self.state.lock().delayed.len()
    }

    /// Run one queued task on the calling thread; `false` if none was
    /// queued.
    pub fn run_one(&self) -> bool {
        let Some(entry) = self.state.lock().queue.pop_front() else {
            return false;
        };
        self.execute(entry);
        true
    }

    /// Run queued tasks (including ones they enqueue) until the queue is
    /// empty; returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }

    /// Advance the virtual clock, promote everything that came due, and run
    /// it; returns how many tasks ran.
    pub fn advance(&self, elapsed: Duration) -> usize {
        {
            let mut state = self.state.lock();
            state.now += elapsed;
            let now = state.now;
            let mut due: Vec<DelayedManual> = Vec::new();
            let mut index = 0;
            while index < state.delayed.len() {
                if state.delayed[index].due <= now {
                    due.push(state.delayed.swap_remove(index));
                } else {
                    index += 1;
                }
            }
            // Deterministic order: by due time, then submission order
            due.sort_by(|a, b| a.due.cmp(&b.due).then(a.seq.cmp(&b.seq)));
            for delayed in due {
                state.queue.push_back(delayed.entry);
            }
        }
        self.run_all()
    }

    fn execute(&self, entry: ManualEntry) {
        if entry.flag.is_cancelled() {
            return;
        }
        match entry.task {
            ManualTask::Once(task) => task(),
            ManualTask::Periodic(mut task, period) => {
                task();
                let mut state = self.state.lock();
                if !entry.flag.is_cancelled() {
                    state.seq += 1;
                    let seq = state.seq;
                    let due = state.now + period;
                    state.delayed.push(DelayedManual {
                        due,
                        seq,
                        entry: ManualEntry {
                            task: ManualTask::Periodic(task, period),
                            flag: entry.flag,
                        },
                    });
                }
            }
        }
    }

    fn submit(&self, task: ManualTask, delay: Option<Duration>) -> Result<Arc<dyn CancelHandle>, SchedulerRejected> {
        let flag = Arc::new(CancelFlag::new());
        let mut state = self.state.lock();
        if state.reject {
            return Err(SchedulerRejected);
        }
        let entry = ManualEntry {
            task,
            flag: Arc::clone(&flag),
        };
        match delay {
            None => state.queue.push_back(entry),
            Some(delay) => {
                state.seq += 1;
                let seq = state.seq;
                let due = state.now + delay;
                state.delayed.push(DelayedManual { due, seq, entry });
            }
        }
        Ok(flag)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, task: Task) -> Result<Arc<dyn CancelHandle>, SchedulerRejected> {
        self.submit(ManualTask::Once(task), None)
    }
}

impl TimeScheduler for ManualScheduler {
    fn schedule_after(
        &self,
        task: Task,
        delay: Duration,
    ) -> Result<Arc<dyn CancelHandle>, SchedulerRejected> {
        self.submit(ManualTask::Once(task), Some(delay))
    }

    fn schedule_periodic(
        &self,
        task: Box<dyn FnMut() + Send + 'static>,
        initial: Duration,
        period: Duration,
    ) -> Result<Arc<dyn CancelHandle>, SchedulerRejected> {
        self.submit(ManualTask::Periodic(task, period), Some(initial))
    }
}
