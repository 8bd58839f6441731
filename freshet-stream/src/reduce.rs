// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Folds the source into a single value emitted on completion.
//!
//! The fold consumes the whole upstream regardless of downstream demand
//! (the upstream is requested unbounded), and the single result goes
//! through the same demand-with-pending-value state machine as
//! [`scan`](crate::scan)'s final emission.

use freshet_core::drain::{COMPLETED_MASK, REQUESTED_MASK};
use freshet_core::{
    add_cap, hooks, validate_demand, FreshetError, Publisher, Subscriber, Subscription,
    SubscriptionSlot, UNBOUNDED,
};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// See [`PublisherExt::reduce`](crate::PublisherExt::reduce).
pub struct Reduce<T, R, P, F> {
    source: P,
    initial: R,
    accumulator: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, R, P, F> Reduce<T, R, P, F> {
    pub(crate) fn new(source: P, initial: R, accumulator: F) -> Self {
        Self {
            source,
            initial,
            accumulator,
            _marker: PhantomData,
        }
    }
}

impl<T, R, P, F> Publisher<R> for Reduce<T, R, P, F>
where
    T: Send + 'static,
    R: Clone + Send + Sync + 'static,
    P: Publisher<T>,
    F: Fn(R, T) -> R + Send + Sync + Clone + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<R>>) {
        let accumulator = self.accumulator.clone();
        let initial = self.initial.clone();
        let subscriber = Arc::new_cyclic(|me: &Weak<ReduceSubscriber<R, F>>| ReduceSubscriber {
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

struct ReduceSubscriber<R, F> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<R>>,
    accumulator: F,
    value: Mutex<Option<R>>,
    /// Low 63 bits outstanding demand, top bit "completed with value".
    requested: AtomicU64,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T, R, F> Subscriber<T> for ReduceSubscriber<R, F>
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
            self.upstream.request(UNBOUNDED);
        }
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            hooks::on_next_dropped(value);
            return;
        }
        let mut guard = self.value.lock();
        if let Some(current) = guard.take() {
            *guard = Some((self.accumulator)(current, value));
        }
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

            if r & REQUESTED_MASK != 0 {
                if let Some(value) = self.value.lock().take() {
                    self.actual.on_next(value);
                }
                self.actual.on_complete();
                return;
            }
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

impl<R, F> Subscription for ReduceSubscriber<R, F>
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

            if r & COMPLETED_MASK != 0 {
                return;
            }

            // The fold itself is demand-independent; only record the credit
            let next = add_cap(r, n);
            if self
                .requested
                .compare_exchange(r, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
        }
    }

    fn cancel(&self) {
        self.upstream.cancel();
    }
}
