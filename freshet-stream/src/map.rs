// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Maps the values of the source publisher one-on-one via a mapper function.

use freshet_core::{hooks, FreshetError, Publisher, Subscriber, Subscription, SubscriptionSlot};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// See [`PublisherExt::map`](crate::PublisherExt::map).
pub struct Map<T, P, F> {
    source: P,
    mapper: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, P, F> Map<T, P, F> {
    pub(crate) fn new(source: P, mapper: F) -> Self {
        Self {
            source,
            mapper,
            _marker: PhantomData,
        }
    }
}

impl<T, R, P, F> Publisher<R> for Map<T, P, F>
where
    T: Send + 'static,
    R: Send + 'static,
    P: Publisher<T>,
    F: Fn(T) -> R + Send + Sync + Clone + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<R>>) {
        let mapper = self.mapper.clone();
        let subscriber = Arc::new_cyclic(|me: &Weak<MapSubscriber<R, F>>| MapSubscriber {
            me: me.clone(),
            actual: subscriber,
            mapper,
            upstream: SubscriptionSlot::new(),
            done: AtomicBool::new(false),
        });
        self.source.subscribe(subscriber);
    }
}

struct MapSubscriber<R, F> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<R>>,
    mapper: F,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T, R, F> Subscriber<T> for MapSubscriber<R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
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
        self.actual.on_next((self.mapper)(value));
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

impl<R, F> Subscription for MapSubscriber<R, F>
where
    R: Send + 'static,
    F: Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        self.upstream.request(n);
    }

    fn cancel(&self) {
        self.upstream.cancel();
    }
}
