// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Filters out subsequent repetitions of the same key.
//!
//! Each value is reduced to a key by the extractor; a value whose key equals
//! the previous key is swallowed and compensated with a `request(1)`
//! upstream.

use freshet_core::{hooks, FreshetError, Publisher, Subscriber, Subscription, SubscriptionSlot};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// See [`PublisherExt::distinct_until_changed`](crate::PublisherExt::distinct_until_changed).
pub struct DistinctUntilChanged<P, F> {
    source: P,
    key_extractor: F,
}

impl<P, F> DistinctUntilChanged<P, F> {
    pub(crate) fn new(source: P, key_extractor: F) -> Self {
        Self {
            source,
            key_extractor,
        }
    }
}

impl<T, K, P, F> Publisher<T> for DistinctUntilChanged<P, F>
where
    T: Send + 'static,
    K: PartialEq + Send + 'static,
    P: Publisher<T>,
    F: Fn(&T) -> K + Send + Sync + Clone + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let key_extractor = self.key_extractor.clone();
        let subscriber =
            Arc::new_cyclic(|me: &Weak<DistinctSubscriber<T, K, F>>| DistinctSubscriber {
                me: me.clone(),
                actual: subscriber,
                key_extractor,
                last_key: Mutex::new(None),
                upstream: SubscriptionSlot::new(),
                done: AtomicBool::new(false),
            });
        self.source.subscribe(subscriber);
    }
}

struct DistinctSubscriber<T, K, F> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<T>>,
    key_extractor: F,
    last_key: Mutex<Option<K>>,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T, K, F> Subscriber<T> for DistinctSubscriber<T, K, F>
where
    T: Send + 'static,
    K: PartialEq + Send + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
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
        let key = (self.key_extractor)(&value);
        let repeated = {
            let mut last = self.last_key.lock();
            let repeated = last.as_ref() == Some(&key);
            *last = Some(key);
            repeated
        };
        if repeated {
            self.upstream.request(1);
        } else {
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

impl<T, K, F> Subscription for DistinctSubscriber<T, K, F>
where
    T: Send + 'static,
    K: PartialEq + Send + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        self.upstream.request(n);
    }

    fn cancel(&self) {
        self.upstream.cancel();
    }
}
