// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Drops values while a predicate holds, then relays everything.

use freshet_core::{hooks, FreshetError, Publisher, Subscriber, Subscription, SubscriptionSlot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// See [`PublisherExt::skip_while`](crate::PublisherExt::skip_while).
pub struct SkipWhile<P, F> {
    source: P,
    predicate: F,
}

impl<P, F> SkipWhile<P, F> {
    pub(crate) fn new(source: P, predicate: F) -> Self {
        Self { source, predicate }
    }
}

impl<T, P, F> Publisher<T> for SkipWhile<P, F>
where
    T: Send + 'static,
    P: Publisher<T>,
    F: Fn(&T) -> bool + Send + Sync + Clone + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let predicate = self.predicate.clone();
        let subscriber =
            Arc::new_cyclic(|me: &Weak<SkipWhileSubscriber<T, F>>| SkipWhileSubscriber {
                me: me.clone(),
                actual: subscriber,
                predicate,
                passed: AtomicBool::new(false),
                upstream: SubscriptionSlot::new(),
                done: AtomicBool::new(false),
            });
        self.source.subscribe(subscriber);
    }
}

struct SkipWhileSubscriber<T, F> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<T>>,
    predicate: F,
    /// The predicate failed once; everything passes from here on.
    passed: AtomicBool,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T, F> Subscriber<T> for SkipWhileSubscriber<T, F>
where
    T: Send + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
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
        if self.passed.load(Ordering::Relaxed) {
            self.actual.on_next(value);
            return;
        }
        if (self.predicate)(&value) {
            self.upstream.request(1);
        } else {
            self.passed.store(true, Ordering::Relaxed);
            self.actual.on_next(value);
        }
    }

    fn on_error(&self, error: FreshetError) {
        if self.done.swap(true, Ordering::AcqRel) {
            hooks::on_error_dropped(&error);
            return;
        }
        self.actual.on_error(error);
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.actual.on_complete();
    }
}

impl<T, F> Subscription for SkipWhileSubscriber<T, F>
where
    T: Send + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        self.upstream.request(n);
    }

    fn cancel(&self) {
        self.upstream.cancel();
    }
}
