// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Drops the first `n` values of the source.
//!
//! The first downstream request is topped up by `n` so the skipped prefix
//! does not eat into the downstream demand.

use freshet_core::{
    add_cap, hooks, FreshetError, Publisher, Subscriber, Subscription, SubscriptionSlot,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// See [`PublisherExt::skip`](crate::PublisherExt::skip).
pub struct Skip<P> {
    source: P,
    n: u64,
}

impl<P> Skip<P> {
    pub(crate) fn new(source: P, n: u64) -> Self {
        Self { source, n }
    }
}

impl<T, P> Publisher<T> for Skip<P>
where
    T: Send + 'static,
    P: Publisher<T>,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let skip = self.n;
        let subscriber = Arc::new_cyclic(|me: &Weak<SkipSubscriber<T>>| SkipSubscriber {
            me: me.clone(),
            actual: subscriber,
            skip,
            skipped: AtomicU64::new(0),
            first_request: AtomicBool::new(false),
            upstream: SubscriptionSlot::new(),
            done: AtomicBool::new(false),
        });
        self.source.subscribe(subscriber);
    }
}

struct SkipSubscriber<T> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<T>>,
    skip: u64,
    skipped: AtomicU64,
    first_request: AtomicBool,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T> Subscriber<T> for SkipSubscriber<T>
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
        if self.skipped.load(Ordering::Relaxed) != self.skip {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.actual.on_next(value);
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

impl<T> Subscription for SkipSubscriber<T>
where
    T: Send + 'static,
{
    fn request(&self, n: u64) {
        if self.first_request.swap(true, Ordering::AcqRel) {
            self.upstream.request(n);
        } else {
            self.upstream.request(add_cap(n, self.skip));
        }
    }

    fn cancel(&self) {
        self.upstream.cancel();
    }
}
