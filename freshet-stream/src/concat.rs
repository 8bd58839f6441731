// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Sequential composition of an ordered list of sources.
//!
//! # Overview
//!
//! Exactly one source is subscribed at a time; the next one starts when the
//! previous completes, so no queueing is needed. Downstream demand is
//! carried across the switches by a
//! [`SubscriptionArbiter`](freshet_core::SubscriptionArbiter): when a source
//! completes with unused demand, the remainder is requested from its
//! successor.
//!
//! Advancing through sources runs on a work-in-progress trampoline so a
//! cascade of empty sources completes iteratively instead of recursing.
//!
//! # Error Handling
//!
//! A failing source terminates the stream immediately, unless errors are
//! delayed, in which case the failure is parked and the remaining sources
//! still run; the stream then terminates with the combined error.

use freshet_core::{
    hooks, validate_demand, FreshetError, Publisher, Subscriber, Subscription,
    SubscriptionArbiter,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Concatenate the given sources in order.
#[must_use]
pub fn concat_array<T>(sources: Vec<Arc<dyn Publisher<T>>>) -> ConcatArray<T> {
    ConcatArray {
        sources,
        delay_errors: false,
    }
}

/// Concatenate the sources produced by an iterable, in order.
#[must_use]
pub fn concat_iter<T, I>(sources: I) -> ConcatArray<T>
where
    I: IntoIterator<Item = Arc<dyn Publisher<T>>>,
{
    concat_array(sources.into_iter().collect())
}

/// See [`concat_array`].
pub struct ConcatArray<T> {
    sources: Vec<Arc<dyn Publisher<T>>>,
    delay_errors: bool,
}

impl<T> ConcatArray<T> {
    /// Park source failures and keep concatenating; terminate with the
    /// combined error at the end.
    #[must_use]
    pub fn delay_errors(mut self) -> Self {
        self.delay_errors = true;
        self
    }
}

impl<T> Publisher<T> for ConcatArray<T>
where
    T: Send + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let sources = self.sources.clone();
        let delay_errors = self.delay_errors;
        let subscriber = Arc::new_cyclic(|me: &Weak<ConcatSubscriber<T>>| ConcatSubscriber {
            me: me.clone(),
            actual: subscriber,
            sources,
            delay_errors,
            index: AtomicUsize::new(0),
            arbiter: SubscriptionArbiter::new(),
            trampoline: AtomicU32::new(0),
            produced_count: AtomicU64::new(0),
            errors: Mutex::new(Vec::new()),
            done: AtomicBool::new(false),
        });
        subscriber.actual.on_subscribe(Arc::clone(&subscriber) as Arc<dyn Subscription>);
        // Kick the trampoline into the first source
        subscriber.on_complete();
    }
}

struct ConcatSubscriber<T> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<T>>,
    sources: Vec<Arc<dyn Publisher<T>>>,
    delay_errors: bool,
    index: AtomicUsize,
    arbiter: SubscriptionArbiter,
    trampoline: AtomicU32,
    /// Values the active source delivered; deducted on its completion.
    produced_count: AtomicU64,
    errors: Mutex<Vec<FreshetError>>,
    done: AtomicBool,
}

impl<T> Subscriber<T> for ConcatSubscriber<T>
where
    T: Send + 'static,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.arbiter.set(subscription);
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) {
            hooks::on_next_dropped(value);
            return;
        }
        self.produced_count.fetch_add(1, Ordering::Relaxed);
        self.actual.on_next(value);
    }

    fn on_error(&self, error: FreshetError) {
        if self.done.load(Ordering::Acquire) {
            hooks::on_error_dropped(&error);
            return;
        }
        if self.delay_errors {
            self.errors.lock().push(error);
            // The failing source is finished; advance like a completion
            self.on_complete();
        } else {
            self.done.store(true, Ordering::Release);
            self.actual.on_error(error);
        }
    }

    fn on_complete(&self) {
        if self.trampoline.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        loop {
            if self.arbiter.is_cancelled() {
                return;
            }

            let produced = self.produced_count.swap(0, Ordering::Relaxed);
            if produced != 0 {
                self.arbiter.produced(produced);
            }

            let index = self.index.load(Ordering::Relaxed);
            if index == self.sources.len() {
                if !self.done.swap(true, Ordering::AcqRel) {
                    let errors = std::mem::take(&mut *self.errors.lock());
                    if errors.is_empty() {
                        self.actual.on_complete();
                    } else {
                        self.actual.on_error(FreshetError::composite(errors));
                    }
                }
                return;
            }
            self.index.store(index + 1, Ordering::Relaxed);

            if let Some(me) = self.me.upgrade() {
                self.sources[index].subscribe(me);
            }

            if self.trampoline.fetch_sub(1, Ordering::AcqRel) == 1 {
                return;
            }
        }
    }
}

impl<T> Subscription for ConcatSubscriber<T>
where
    T: Send + 'static,
{
    fn request(&self, n: u64) {
        if validate_demand(n) {
            self.arbiter.request(n);
        }
    }

    fn cancel(&self) {
        self.arbiter.cancel();
    }
}
