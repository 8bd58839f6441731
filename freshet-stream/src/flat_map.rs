// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Maps each value to an inner publisher and merges the inner streams.
//!
//! # Overview
//!
//! The outer subscriber requests `max_concurrency` sources worth of values
//! from its upstream and keeps at most that many inner subscriptions alive.
//! Every inner gets a bounded SPSC queue of `prefetch` elements; a single
//! wip-serialized drain round-robins the non-empty queues into the
//! downstream within its demand, replenishing each inner after three
//! quarters of its prefetch and requesting one more outer value whenever an
//! inner finishes.
//!
//! Inner publishers that expose a scalar value
//! ([`Publisher::as_scalar`]) bypass the inner-subscription machinery
//! entirely and go through a dedicated scalar queue.
//!
//! Values of one inner stay ordered; no order is guaranteed across inners.
//!
//! # Error Handling
//!
//! With `delay_errors`, failures accumulate and the stream terminates with
//! the combined error once every source finished. Without it, the first
//! failure cancels everything and propagates immediately.

use freshet_core::{
    add_demand, hooks, produced, validate_demand, FreshetError, Publisher, SpscArrayQueue,
    Subscriber, Subscription, SubscriptionSlot,
};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// See [`PublisherExt::flat_map`](crate::PublisherExt::flat_map).
pub struct FlatMap<T, P, F> {
    source: P,
    mapper: F,
    max_concurrency: usize,
    prefetch: usize,
    delay_errors: bool,
    _marker: PhantomData<fn(T)>,
}

impl<T, P, F> FlatMap<T, P, F> {
    pub(crate) fn new(
        source: P,
        mapper: F,
        max_concurrency: usize,
        prefetch: usize,
        delay_errors: bool,
    ) -> Self {
        assert!(max_concurrency > 0, "max_concurrency must be at least 1");
        assert!(prefetch > 0, "prefetch must be at least 1");
        Self {
            source,
            mapper,
            max_concurrency,
            prefetch,
            delay_errors,
            _marker: PhantomData,
        }
    }
}

impl<T, R, P, F> Publisher<R> for FlatMap<T, P, F>
where
    T: Send + 'static,
    R: Send + 'static,
    P: Publisher<T>,
    F: Fn(T) -> Arc<dyn Publisher<R>> + Send + Sync + Clone + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<R>>) {
        let mapper = self.mapper.clone();
        let max_concurrency = self.max_concurrency;
        let prefetch = self.prefetch;
        let delay_errors = self.delay_errors;
        let subscriber = Arc::new_cyclic(|me: &Weak<FlatMapMain<R, F>>| FlatMapMain {
            me: me.clone(),
            actual: subscriber,
            mapper,
            max_concurrency,
            prefetch,
            inner_limit: prefetch - (prefetch >> 2),
            scalar_limit: (max_concurrency - (max_concurrency >> 2)).max(1),
            delay_errors,
            scalar_queue: SpscArrayQueue::new(max_concurrency),
            scalar_emitted: AtomicU64::new(0),
            inners: Mutex::new(Vec::new()),
            last_index: AtomicUsize::new(0),
            requested: AtomicU64::new(0),
            wip: AtomicU32::new(0),
            upstream: SubscriptionSlot::new(),
            errors: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
            cleaned_up: AtomicBool::new(false),
            done: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        });
        self.source.subscribe(subscriber);
    }
}

struct FlatMapMain<R, F> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<R>>,
    mapper: F,
    max_concurrency: usize,
    prefetch: usize,
    inner_limit: usize,
    scalar_limit: usize,
    delay_errors: bool,
    /// Scalar short-circuited values; fed by the serial outer `on_next`.
    scalar_queue: SpscArrayQueue<R>,
    /// Scalars emitted since the last outer replenishment; drain-owned.
    scalar_emitted: AtomicU64,
    inners: Mutex<Vec<Arc<FlatMapInner<R, F>>>>,
    last_index: AtomicUsize,
    requested: AtomicU64,
    wip: AtomicU32,
    upstream: SubscriptionSlot,
    errors: Mutex<Vec<FreshetError>>,
    cancelled: AtomicBool,
    cleaned_up: AtomicBool,
    done: AtomicBool,
    terminated: AtomicBool,
}

struct FlatMapInner<R, F> {
    parent: Weak<FlatMapMain<R, F>>,
    queue: SpscArrayQueue<R>,
    limit: usize,
    /// Values consumed since the last replenishment; drain-owned.
    consumed: AtomicU64,
    upstream: SubscriptionSlot,
    done: AtomicBool,
    /// Whether the drain already removed this inner and re-requested outer.
    removed: AtomicBool,
}

impl<R, F> FlatMapMain<R, F>
where
    R: Send + 'static,
    F: Send + Sync + 'static,
{
    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) == 0 {
            self.drain_loop(1);
        }
    }

    fn drain_loop(&self, mut missed: u32) {
        loop {
            if self.drain_work() {
                return;
            }
            let wip = self.wip.fetch_sub(missed, Ordering::AcqRel);
            if wip == missed {
                return;
            }
            missed = wip - missed;
        }
    }

    /// One drain pass. Returns `true` once the stream reached a terminal
    /// state and the loop must stop.
    fn drain_work(&self) -> bool {
        if self.check_terminated() {
            return true;
        }

        let r = self.requested.load(Ordering::Acquire);
        let mut emitted = 0u64;
        let mut freed_inners = 0u64;

        // Scalars first
        while emitted != r {
            if self.check_terminated() {
                return true;
            }
            match self.scalar_queue.poll() {
                Some(value) => {
                    self.actual.on_next(value);
                    emitted += 1;
                    self.replenish_scalar(1);
                }
                None => break,
            }
        }

        let inners: Vec<Arc<FlatMapInner<R, F>>> = self.inners.lock().clone();
        if !inners.is_empty() {
            let count = inners.len();
            let mut index = self.last_index.load(Ordering::Relaxed) % count;
            let mut progressed = true;

            while progressed {
                progressed = false;
                for _ in 0..count {
                    if self.check_terminated() {
                        return true;
                    }
                    let inner = &inners[index];
                    index = (index + 1) % count;

                    if emitted != r {
                        if let Some(value) = inner.queue.poll() {
                            self.actual.on_next(value);
                            emitted += 1;
                            inner.replenish(1);
                            progressed = true;
                            continue;
                        }
                    }
                    if inner.done.load(Ordering::Acquire)
                        && inner.queue.is_empty()
                        && !inner.removed.swap(true, Ordering::AcqRel)
                    {
                        self.remove_inner(inner);
                        freed_inners += 1;
                        progressed = true;
                    }
                }
            }
            self.last_index.store(index, Ordering::Relaxed);
        }

        if emitted != 0 {
            produced(&self.requested, emitted);
        }
        if freed_inners != 0 {
            self.upstream.request(freed_inners);
        }

        if self.done.load(Ordering::Acquire)
            && self.scalar_queue.is_empty()
            && self.inners.lock().is_empty()
        {
            self.terminated.store(true, Ordering::Release);
            let errors = std::mem::take(&mut *self.errors.lock());
            if errors.is_empty() {
                self.actual.on_complete();
            } else {
                self.actual.on_error(FreshetError::composite(errors));
            }
            return true;
        }

        false
    }

    fn check_terminated(&self) -> bool {
        if self.terminated.load(Ordering::Acquire) {
            return true;
        }
        if self.cancelled.load(Ordering::Acquire) {
            self.cleanup();
            return true;
        }
        if !self.delay_errors {
            let error = {
                let mut errors = self.errors.lock();
                if errors.is_empty() {
                    None
                } else {
                    Some(errors.swap_remove(0))
                }
            };
            if let Some(error) = error {
                self.terminated.store(true, Ordering::Release);
                self.cleanup();
                self.actual.on_error(error);
                return true;
            }
        }
        false
    }

    fn cleanup(&self) {
        if self.cleaned_up.swap(true, Ordering::AcqRel) {
            return;
        }
        self.upstream.cancel();
        let inners = std::mem::take(&mut *self.inners.lock());
        for inner in inners {
            inner.upstream.cancel();
            inner.queue.clear();
        }
        self.scalar_queue.clear();
    }

    fn remove_inner(&self, target: &Arc<FlatMapInner<R, F>>) {
        let mut inners = self.inners.lock();
        inners.retain(|inner| !Arc::ptr_eq(inner, target));
    }

    fn replenish_scalar(&self, k: u64) {
        let count = self.scalar_emitted.load(Ordering::Relaxed) + k;
        if count >= self.scalar_limit as u64 {
            self.scalar_emitted.store(0, Ordering::Relaxed);
            self.upstream.request(count);
        } else {
            self.scalar_emitted.store(count, Ordering::Relaxed);
        }
    }

    fn try_emit_scalar(&self, value: R) {
        if self
            .wip
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let r = self.requested.load(Ordering::Acquire);
            if r != 0 && self.scalar_queue.is_empty() {
                self.actual.on_next(value);
                produced(&self.requested, 1);
                self.replenish_scalar(1);
            } else if !self.scalar_queue.offer(value) {
                self.overflow_error("flat_map scalar queue");
            }
            let wip = self.wip.fetch_sub(1, Ordering::AcqRel);
            if wip != 1 {
                self.drain_loop(wip - 1);
            }
        } else {
            if !self.scalar_queue.offer(value) {
                self.overflow_error("flat_map scalar queue");
            }
            self.drain();
        }
    }

    fn overflow_error(&self, which: &str) {
        self.record_error(FreshetError::overflow(which.to_string()));
    }

    fn record_error(&self, error: FreshetError) {
        if self.terminated.load(Ordering::Acquire) {
            hooks::on_error_dropped(&error);
            return;
        }
        let mut errors = self.errors.lock();
        if self.delay_errors || errors.is_empty() {
            errors.push(error);
        } else {
            drop(errors);
            hooks::on_error_dropped(&error);
        }
    }

    fn inner_error(&self, inner: &FlatMapInner<R, F>, error: FreshetError) {
        inner.done.store(true, Ordering::Release);
        self.record_error(error);
        self.drain();
    }
}

impl<T, R, F> Subscriber<T> for FlatMapMain<R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Arc<dyn Publisher<R>> + Send + Sync + 'static,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.upstream.set_once(subscription) {
            if let Some(me) = self.me.upgrade() {
                self.actual.on_subscribe(me);
            }
            self.upstream.request(self.max_concurrency as u64);
        }
    }

    fn on_next(&self, value: T) {
        if self.done.load(Ordering::Acquire) || self.cancelled.load(Ordering::Acquire) {
            hooks::on_next_dropped(value);
            return;
        }
        let publisher = (self.mapper)(value);

        if let Some(scalar) = publisher.as_scalar() {
            self.try_emit_scalar(scalar);
            return;
        }

        let inner = Arc::new(FlatMapInner {
            parent: self.me.clone(),
            queue: SpscArrayQueue::new(self.prefetch),
            limit: self.inner_limit,
            consumed: AtomicU64::new(0),
            upstream: SubscriptionSlot::new(),
            done: AtomicBool::new(false),
            removed: AtomicBool::new(false),
        });
        self.inners.lock().push(Arc::clone(&inner));
        if self.cancelled.load(Ordering::Acquire) {
            self.remove_inner(&inner);
            return;
        }
        publisher.subscribe(inner);
    }

    fn on_error(&self, error: FreshetError) {
        if self.done.load(Ordering::Acquire) {
            hooks::on_error_dropped(&error);
            return;
        }
        self.record_error(error);
        self.done.store(true, Ordering::Release);
        self.drain();
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        self.drain();
    }
}

impl<R, F> Subscription for FlatMapMain<R, F>
where
    R: Send + 'static,
    F: Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if !validate_demand(n) {
            return;
        }
        add_demand(&self.requested, n);
        self.drain();
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.drain();
    }
}

impl<R, F> FlatMapInner<R, F> {
    fn replenish(&self, k: u64) {
        let count = self.consumed.load(Ordering::Relaxed) + k;
        if count >= self.limit as u64 {
            self.consumed.store(0, Ordering::Relaxed);
            self.upstream.request(count);
        } else {
            self.consumed.store(count, Ordering::Relaxed);
        }
    }
}

impl<R, F> Subscriber<R> for FlatMapInner<R, F>
where
    R: Send + 'static,
    F: Send + Sync + 'static,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.upstream.set_once(subscription) {
            self.upstream.request(self.queue.capacity() as u64);
        }
    }

    fn on_next(&self, value: R) {
        let Some(parent) = self.parent.upgrade() else {
            return;
        };
        if self.done.load(Ordering::Acquire) {
            hooks::on_next_dropped(value);
            return;
        }
        if self.queue.offer(value) {
            parent.drain();
        } else {
            parent.inner_error(self, FreshetError::overflow("flat_map inner queue"));
        }
    }

    fn on_error(&self, error: FreshetError) {
        let Some(parent) = self.parent.upgrade() else {
            return;
        };
        if self.done.load(Ordering::Acquire) {
            hooks::on_error_dropped(&error);
            return;
        }
        parent.inner_error(self, error);
    }

    fn on_complete(&self) {
        let Some(parent) = self.parent.upgrade() else {
            return;
        };
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        parent.drain();
    }
}
