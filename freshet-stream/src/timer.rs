// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Time-based sources bridging a scheduler into a stream.
//!
//! Ticks fire on the scheduler; each delivery checks demand first and a
//! lagging downstream fails the stream rather than blocking the worker.
//! Cancellation races the scheduled task through a
//! [`TaskSlot`](freshet_core::TaskSlot), so the task's cancel handle runs at
//! most once no matter which side wins.

use freshet_core::{
    add_demand, produced, validate_demand, FreshetError, Publisher, Subscriber, Subscription,
    TaskSlot, TimeScheduler,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Emit a single `0` after `delay`, then complete.
#[must_use]
pub fn timer(delay: Duration, scheduler: Arc<dyn TimeScheduler>) -> Timer {
    Timer { delay, scheduler }
}

/// Emit `0, 1, 2, …` every `period`, starting after `initial`.
#[must_use]
pub fn interval(
    initial: Duration,
    period: Duration,
    scheduler: Arc<dyn TimeScheduler>,
) -> Interval {
    Interval {
        initial,
        period,
        scheduler,
    }
}

/// See [`timer`].
pub struct Timer {
    delay: Duration,
    scheduler: Arc<dyn TimeScheduler>,
}

impl Publisher<u64> for Timer {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<u64>>) {
        let subscription = Arc::new(TimerSubscription {
            actual: Arc::clone(&subscriber),
            requested: AtomicBool::new(false),
            slot: TaskSlot::new(),
        });
        subscriber.on_subscribe(Arc::clone(&subscription) as Arc<dyn Subscription>);

        let task_target = Arc::clone(&subscription);
        match self
            .scheduler
            .schedule_after(Box::new(move || task_target.fire()), self.delay)
        {
            Ok(handle) => subscription.slot.install(handle),
            Err(_) => {
                if !subscription.slot.is_cancelled() {
                    subscription
                        .actual
                        .on_error(FreshetError::rejected("timer task"));
                }
            }
        }
    }
}

struct TimerSubscription {
    actual: Arc<dyn Subscriber<u64>>,
    requested: AtomicBool,
    slot: TaskSlot,
}

impl TimerSubscription {
    fn fire(&self) {
        if self.slot.is_cancelled() {
            return;
        }
        if self.requested.load(Ordering::Acquire) {
            self.actual.on_next(0);
            if !self.slot.is_cancelled() {
                self.actual.on_complete();
            }
        } else {
            self.actual.on_error(FreshetError::lack_of_demand(
                "timer fired before any request",
            ));
        }
    }
}

impl Subscription for TimerSubscription {
    fn request(&self, n: u64) {
        if validate_demand(n) {
            self.requested.store(true, Ordering::Release);
        }
    }

    fn cancel(&self) {
        self.slot.cancel();
    }
}

/// See [`interval`].
pub struct Interval {
    initial: Duration,
    period: Duration,
    scheduler: Arc<dyn TimeScheduler>,
}

impl Publisher<u64> for Interval {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<u64>>) {
        let subscription = Arc::new(IntervalSubscription {
            actual: Arc::clone(&subscriber),
            requested: AtomicU64::new(0),
            count: AtomicU64::new(0),
            slot: TaskSlot::new(),
            done: AtomicBool::new(false),
        });
        subscriber.on_subscribe(Arc::clone(&subscription) as Arc<dyn Subscription>);

        let task_target = Arc::clone(&subscription);
        match self.scheduler.schedule_periodic(
            Box::new(move || task_target.tick()),
            self.initial,
            self.period,
        ) {
            Ok(handle) => subscription.slot.install(handle),
            Err(_) => {
                if !subscription.slot.is_cancelled() {
                    subscription
                        .actual
                        .on_error(FreshetError::rejected("interval task"));
                }
            }
        }
    }
}

struct IntervalSubscription {
    actual: Arc<dyn Subscriber<u64>>,
    requested: AtomicU64,
    count: AtomicU64,
    slot: TaskSlot,
    done: AtomicBool,
}

impl IntervalSubscription {
    fn tick(&self) {
        if self.done.load(Ordering::Acquire) || self.slot.is_cancelled() {
            return;
        }
        if self.requested.load(Ordering::Acquire) != 0 {
            let tick = self.count.fetch_add(1, Ordering::Relaxed);
            self.actual.on_next(tick);
            produced(&self.requested, 1);
        } else {
            self.done.store(true, Ordering::Release);
            self.slot.cancel();
            self.actual.on_error(FreshetError::lack_of_demand(format!(
                "could not emit tick {} due to lack of requests",
                self.count.load(Ordering::Relaxed)
            )));
        }
    }
}

impl Subscription for IntervalSubscription {
    fn request(&self, n: u64) {
        if validate_demand(n) {
            add_demand(&self.requested, n);
        }
    }

    fn cancel(&self) {
        self.slot.cancel();
    }
}
