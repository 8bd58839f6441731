// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Aggregates the source values with an accumulator function and emits the
//! intermediate results.
//!
//! The accumulation starts from the initial value and emits it first:
//!
//! ```text
//! result[0] = initial
//! result[1] = accumulator(result[0], source[0])
//! result[2] = accumulator(result[1], source[1])
//! ...
//! ```
//!
//! The final accumulated value is only deliverable once the source
//! completes, so its emission shares one state field with the outstanding
//! demand: the top bit flags "completed with a pending value", the low bits
//! count requests. A late request replays the pending value.

use freshet_core::drain::{COMPLETED_MASK, REQUESTED_MASK};
use freshet_core::{
    add_cap, hooks, produced, validate_demand, FreshetError, Publisher, Subscriber, Subscription,
    SubscriptionSlot,
};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// See [`PublisherExt::scan`](crate::PublisherExt::scan).
pub struct Scan<T, R, P, F> {
    source: P,
    initial: R,
    accumulator: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, R, P, F> Scan<T, R, P, F> {
    pub(crate) fn new(source: P, initial: R, accumulator: F) -> Self {
        Self {
            source,
            initial,
            accumulator,
            _marker: PhantomData,
        }
    }
}

impl<T, R, P, F> Publisher<R> for Scan<T, R, P, F>
where
    T: Send + 'static,
    R: Clone + Send + Sync + 'static,
    P: Publisher<T>,
    F: Fn(R, T) -> R + Send + Sync + Clone + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<R>>) {
        let accumulator = self.accumulator.clone();
        let initial = self.initial.clone();
        let subscriber = Arc::new_cyclic(|me: &Weak<ScanSubscriber<R, F>>| ScanSubscriber {
            me: me.clone(),
            actual: subscriber,
            accumulator,
            value: Mutex::new(Some(initial)),
            requested: AtomicU64::new(0),
            upstream: SubscriptionSlot::new(),
            done: AtomicBool::new(false),
        });
        self.source.subscribe(subscriber);
    }
}

struct ScanSubscriber<R, F> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<R>>,
    accumulator: F,
    value: Mutex<Option<R>>,
    /// Low 63 bits outstanding demand, top bit "completed with value".
    requested: AtomicU64,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T, R, F> Subscriber<T> for ScanSubscriber<R, F>
where
    T: Send + 'static,
    R: Clone + Send + Sync + 'static,
    F: Fn(R, T) -> R + Send + Sync + 'static,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.upstream.set_once(subscription) {
            if let Some(me) = self.me.upgrade() {
                self.actual.on_subscribe(me);
            }
        }
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            hooks::on_next_dropped(value);
            return;
        }
        let Some(current) = self.value.lock().take() else {
            return;
        };

        self.actual.on_next(current.clone());
        produced(&self.requested, 1);

        let next = (self.accumulator)(current, value);
        *self.value.lock() = Some(next);
    }

    fn on_error(&self, error: FreshetError) {
        if self.done.swap(true, Ordering::AcqRel) {
            hooks::on_error_dropped(&error);
            return;
        }
        self.value.lock().take();
        self.actual.on_error(error);
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        loop {
            let r = self.requested.load(Ordering::Acquire);

            // Demand left over: emit the final value right away
            if r & REQUESTED_MASK != 0 {
                if let Some(value) = self.value.lock().take() {
                    self.actual.on_next(value);
                }
                self.actual.on_complete();
                return;
            }
            // (no request, has value): park until a request arrives
            if self
                .requested
                .compare_exchange(0, COMPLETED_MASK, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }
}

impl<R, F> Subscription for ScanSubscriber<R, F>
where
    R: Clone + Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if !validate_demand(n) {
            return;
        }
        loop {
            let r = self.requested.load(Ordering::Acquire);

            // (no request, has value): any positive request releases it
            if r == COMPLETED_MASK {
                if self
                    .requested
                    .compare_exchange(
                        COMPLETED_MASK,
                        COMPLETED_MASK | 1,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    if let Some(value) = self.value.lock().take() {
                        self.actual.on_next(value);
                    }
                    self.actual.on_complete();
                }
                return;
            }

            // (has request, has value): the value is already on its way
            if r & COMPLETED_MASK != 0 {
                return;
            }

            let next = add_cap(r, n);
            if self
                .requested
                .compare_exchange(r, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.upstream.request(n);
                return;
            }
        }
    }

    fn cancel(&self) {
        self.upstream.cancel();
    }
}
