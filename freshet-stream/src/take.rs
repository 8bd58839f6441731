// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Relays the first `n` values, then completes and cancels upstream.

use freshet_core::{
    hooks, EmptySubscription, FreshetError, Publisher, Subscriber, Subscription, SubscriptionSlot,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// See [`PublisherExt::take`](crate::PublisherExt::take).
pub struct Take<P> {
    source: P,
    n: u64,
}

impl<P> Take<P> {
    pub(crate) fn new(source: P, n: u64) -> Self {
        Self { source, n }
    }
}

impl<T, P> Publisher<T> for Take<P>
where
    T: Send + 'static,
    P: Publisher<T>,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        if self.n == 0 {
            EmptySubscription::complete(&*subscriber);
            return;
        }
        let remaining = self.n;
        let subscriber = Arc::new_cyclic(|me: &Weak<TakeSubscriber<T>>| TakeSubscriber {
            me: me.clone(),
            actual: subscriber,
            remaining: AtomicU64::new(remaining),
            upstream: SubscriptionSlot::new(),
            done: AtomicBool::new(false),
        });
        self.source.subscribe(subscriber);
    }
}

struct TakeSubscriber<T> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<T>>,
    remaining: AtomicU64,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T> Subscriber<T> for TakeSubscriber<T>
where
    T: Send + 'static,
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
        let left = self.remaining.fetch_sub(1, Ordering::AcqRel);
        if left == 0 {
            // Upstream overdelivered past the cut-off
            hooks::on_next_dropped(value);
            return;
        }
        self.actual.on_next(value);
        if left == 1 && !self.done.swap(true, Ordering::AcqRel) {
            self.upstream.cancel();
            self.actual.on_complete();
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

impl<T> Subscription for TakeSubscriber<T>
where
    T: Send + 'static,
{
    fn request(&self, n: u64) {
        self.upstream.request(n);
    }

    fn cancel(&self) {
        self.upstream.cancel();
    }
}
