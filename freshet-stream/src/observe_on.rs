// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Moves downstream delivery onto a scheduler.
//!
//! # Overview
//!
//! `observe_on` decouples upstream emission from downstream consumption: the
//! upstream side offers values into a bounded SPSC queue and every signal
//! schedules a drain task; the drain runs on the scheduler worker, emits
//! within the downstream demand and replenishes the upstream once three
//! quarters of the prefetch have been consumed.
//!
//! The work-in-progress counter serializes the drain: whichever signal
//! transitions it from zero schedules exactly one task, every concurrent
//! signal just raises the counter and the running drain picks the extra
//! work up before exiting.
//!
//! # Error Handling
//!
//! - A full queue means the upstream ignored the prefetch: the stream fails
//!   with an overflow error.
//! - A scheduler refusing the drain task fails the stream with a
//!   rejected-execution error.
//! - With `delay_error` the terminal error waits for the queue to empty;
//!   otherwise it cuts past buffered values.

use freshet_core::{
    add_demand, hooks, produced, validate_demand, FreshetError, Publisher, Scheduler,
    SpscArrayQueue, Subscriber, Subscription, SubscriptionSlot,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Factory for the bounded hand-off queue, keyed by capacity.
pub type QueueSupplier<T> = Arc<dyn Fn(usize) -> SpscArrayQueue<T> + Send + Sync>;

/// See [`PublisherExt::observe_on`](crate::PublisherExt::observe_on).
pub struct ObserveOn<T, P> {
    source: P,
    scheduler: Arc<dyn Scheduler>,
    prefetch: usize,
    delay_error: bool,
    queue_supplier: QueueSupplier<T>,
}

impl<T: 'static, P> ObserveOn<T, P> {
    pub(crate) fn new(source: P, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::with(
            source,
            scheduler,
            crate::DEFAULT_PREFETCH,
            false,
            Arc::new(SpscArrayQueue::new),
        )
    }

    pub(crate) fn with(
        source: P,
        scheduler: Arc<dyn Scheduler>,
        prefetch: usize,
        delay_error: bool,
        queue_supplier: QueueSupplier<T>,
    ) -> Self {
        assert!(prefetch > 0, "prefetch must be at least 1");
        Self {
            source,
            scheduler,
            prefetch,
            delay_error,
            queue_supplier,
        }
    }
}

impl<T, P> Publisher<T> for ObserveOn<T, P>
where
    T: Send + 'static,
    P: Publisher<T>,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let queue = (self.queue_supplier)(self.prefetch);
        let scheduler = Arc::clone(&self.scheduler);
        let prefetch = self.prefetch;
        let delay_error = self.delay_error;
        let subscriber = Arc::new_cyclic(|me: &Weak<ObserveOnSubscriber<T>>| {
            ObserveOnSubscriber {
                me: me.clone(),
                actual: subscriber,
                scheduler,
                queue,
                prefetch,
                limit: prefetch - (prefetch >> 2),
                delay_error,
                requested: AtomicU64::new(0),
                wip: AtomicU32::new(0),
                consumed: AtomicU64::new(0),
                upstream: SubscriptionSlot::new(),
                cancelled: AtomicBool::new(false),
                done: AtomicBool::new(false),
                error: Mutex::new(None),
            }
        });
        self.source.subscribe(subscriber);
    }
}

struct ObserveOnSubscriber<T> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<T>>,
    scheduler: Arc<dyn Scheduler>,
    queue: SpscArrayQueue<T>,
    prefetch: usize,
    /// Replenishment threshold: request more once this many were consumed.
    limit: usize,
    delay_error: bool,
    requested: AtomicU64,
    wip: AtomicU32,
    /// Values consumed since the last upstream replenishment; drain-owned.
    consumed: AtomicU64,
    upstream: SubscriptionSlot,
    cancelled: AtomicBool,
    done: AtomicBool,
    error: Mutex<Option<FreshetError>>,
}

impl<T: Send + 'static> ObserveOnSubscriber<T> {
    fn try_schedule(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let task = Box::new(move || me.drain());
        if self.scheduler.schedule(task).is_err() {
            self.upstream.cancel();
            self.queue.clear();
            if !self.cancelled.swap(true, Ordering::AcqRel) {
                self.actual
                    .on_error(FreshetError::rejected("observe_on drain task"));
            }
        }
    }

    fn drain(&self) {
        let mut missed = 1u32;
        loop {
            let r = self.requested.load(Ordering::Acquire);
            let mut emitted = 0u64;

            while emitted != r {
                let done = self.done.load(Ordering::Acquire);
                match self.queue.poll() {
                    Some(value) => {
                        if self.check_terminated(done, false) {
                            return;
                        }
                        self.actual.on_next(value);
                        emitted += 1;

                        let consumed = self.consumed.load(Ordering::Relaxed) + 1;
                        if consumed >= self.limit as u64 {
                            self.consumed.store(0, Ordering::Relaxed);
                            self.upstream.request(consumed);
                        } else {
                            self.consumed.store(consumed, Ordering::Relaxed);
                        }
                    }
                    None => {
                        if self.check_terminated(done, true) {
                            return;
                        }
                        break;
                    }
                }
            }

            if emitted == r
                && self.check_terminated(self.done.load(Ordering::Acquire), self.queue.is_empty())
            {
                return;
            }

            if emitted != 0 {
                produced(&self.requested, emitted);
            }

            let wip = self.wip.fetch_sub(missed, Ordering::AcqRel);
            if wip == missed {
                return;
            }
            missed = wip - missed;
        }
    }

    /// Handles cancellation and the terminal signals; returns `true` when
    /// the drain must stop.
    fn check_terminated(&self, done: bool, empty: bool) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            self.queue.clear();
            return true;
        }
        if !done {
            return false;
        }
        if self.delay_error {
            if empty {
                self.cancelled.store(true, Ordering::Release);
                match self.error.lock().take() {
                    Some(error) => self.actual.on_error(error),
                    None => self.actual.on_complete(),
                }
                return true;
            }
            return false;
        }
        let error = self.error.lock().take();
        if let Some(error) = error {
            self.cancelled.store(true, Ordering::Release);
            self.queue.clear();
            self.actual.on_error(error);
            return true;
        }
        if empty {
            self.cancelled.store(true, Ordering::Release);
            self.actual.on_complete();
            return true;
        }
        false
    }
}

impl<T: Send + 'static> Subscriber<T> for ObserveOnSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.upstream.set_once(subscription) {
            if let Some(me) = self.me.upgrade() {
                self.actual.on_subscribe(me);
            }
            self.upstream.request(self.prefetch as u64);
        }
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) || self.cancelled.load(Ordering::Acquire) {
            hooks::on_next_dropped(value);
            return;
        }
        if !self.queue.offer(value) {
            self.upstream.cancel();
            *self.error.lock() = Some(FreshetError::overflow(format!(
                "observe_on queue is full (prefetch {})",
                self.prefetch
            )));
            self.done.store(true, Ordering::Release);
        }
        self.try_schedule();
    }

    fn on_error(&self, error: FreshetError) {
        if self.done.load(Ordering::Acquire) {
            hooks::on_error_dropped(&error);
            return;
        }
        // The error must be visible before `done`, or the drain could
        // observe the completion without its cause
        *self.error.lock() = Some(error);
        self.done.store(true, Ordering::Release);
        self.try_schedule();
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.try_schedule();
    }
}

impl<T: Send + 'static> Subscription for ObserveOnSubscriber<T> {
    fn request(&self, n: u64) {
        if !validate_demand(n) {
            return;
        }
        add_demand(&self.requested, n);
        self.try_schedule();
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.upstream.cancel();
        self.try_schedule();
    }
}
