// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Combines N sources row-wise by index.
//!
//! # Overview
//!
//! Each source feeds a bounded queue; a single wip-serialized drain emits
//! one zipped row whenever every queue holds at least one value and the
//! downstream has demand. Row fields follow the declaration order of the
//! sources, and rows are emitted strictly in the order they become
//! complete.
//!
//! As soon as any completed source's queue runs empty no further row can
//! ever form: the stream completes and the other sources are cancelled.
//!
//! # Error Handling
//!
//! The first source failure cancels everything and propagates immediately.

use freshet_core::{
    add_demand, hooks, produced, validate_demand, EmptySubscription, FreshetError, Publisher,
    SpscArrayQueue, Subscriber, Subscription, SubscriptionSlot,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Zip the given sources into rows combined by `zipper`.
///
/// ```
/// use freshet_stream::zip;
/// use freshet_stream::prelude::*;
/// use std::sync::Arc;
///
/// let sources: Vec<Arc<dyn Publisher<i64>>> = vec![
///     Arc::new(range(1, 3)),
///     Arc::new(range(10, 3)),
/// ];
/// let sums = zip(sources, |row: Vec<i64>| row.iter().sum::<i64>());
/// ```
#[must_use]
pub fn zip<T, R, F>(sources: Vec<Arc<dyn Publisher<T>>>, zipper: F) -> Zip<T, R, F>
where
    F: Fn(Vec<T>) -> R,
{
    zip_with_prefetch(sources, crate::DEFAULT_FAN_IN_PREFETCH, zipper)
}

/// [`zip`] with an explicit per-source prefetch.
#[must_use]
pub fn zip_with_prefetch<T, R, F>(
    sources: Vec<Arc<dyn Publisher<T>>>,
    prefetch: usize,
    zipper: F,
) -> Zip<T, R, F>
where
    F: Fn(Vec<T>) -> R,
{
    assert!(prefetch > 0, "prefetch must be at least 1");
    Zip {
        sources,
        prefetch,
        zipper,
        _marker: std::marker::PhantomData,
    }
}

/// See [`zip`].
pub struct Zip<T, R, F> {
    sources: Vec<Arc<dyn Publisher<T>>>,
    prefetch: usize,
    zipper: F,
    _marker: std::marker::PhantomData<fn(T) -> R>,
}

impl<T, R, F> Publisher<R> for Zip<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(Vec<T>) -> R + Send + Sync + Clone + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<R>>) {
        if self.sources.is_empty() {
            EmptySubscription::complete(&*subscriber);
            return;
        }
        let zipper = self.zipper.clone();
        let prefetch = self.prefetch;
        let count = self.sources.len();
        let coordinator = Arc::new_cyclic(|me: &Weak<ZipCoordinator<T, R, F>>| ZipCoordinator {
            actual: subscriber,
            zipper,
            inners: (0..count)
                .map(|_| {
                    Arc::new(ZipInner {
                        parent: me.clone(),
                        queue: SpscArrayQueue::new(prefetch),
                        limit: prefetch - (prefetch >> 2),
                        consumed: AtomicU64::new(0),
                        upstream: SubscriptionSlot::new(),
                        done: AtomicBool::new(false),
                    })
                })
                .collect(),
            requested: AtomicU64::new(0),
            wip: AtomicU32::new(0),
            error: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            cleaned_up: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        });

        coordinator
            .actual
            .on_subscribe(Arc::clone(&coordinator) as Arc<dyn Subscription>);

        for (index, source) in self.sources.iter().enumerate() {
            if coordinator.cancelled.load(Ordering::Acquire)
                || coordinator.terminated.load(Ordering::Acquire)
            {
                return;
            }
            source.subscribe(Arc::clone(&coordinator.inners[index]) as Arc<dyn Subscriber<T>>);
        }
    }
}

struct ZipCoordinator<T, R, F> {
    actual: Arc<dyn Subscriber<R>>,
    zipper: F,
    inners: Vec<Arc<ZipInner<T, R, F>>>,
    requested: AtomicU64,
    wip: AtomicU32,
    error: Mutex<Option<FreshetError>>,
    cancelled: AtomicBool,
    cleaned_up: AtomicBool,
    terminated: AtomicBool,
}

struct ZipInner<T, R, F> {
    parent: Weak<ZipCoordinator<T, R, F>>,
    queue: SpscArrayQueue<T>,
    limit: usize,
    /// Values consumed since the last replenishment; drain-owned.
    consumed: AtomicU64,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T, R, F> ZipCoordinator<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(Vec<T>) -> R + Send + Sync + 'static,
{
    fn record_error(&self, error: FreshetError) {
        {
            let mut slot = self.error.lock();
            if slot.is_none() {
                *slot = Some(error);
            } else {
                drop(slot);
                hooks::on_error_dropped(&error);
            }
        }
        self.drain();
    }

    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        let mut missed = 1u32;
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

    /// One drain pass; returns `true` on a terminal state.
    fn drain_work(&self) -> bool {
        let r = self.requested.load(Ordering::Acquire);
        let mut emitted = 0u64;

        loop {
            if self.check_terminated() {
                return true;
            }

            // A row forms only when every queue has a value; a done source
            // with an empty queue ends the stream instead.
            let mut ready = true;
            for inner in &self.inners {
                if inner.queue.is_empty() {
                    if inner.done.load(Ordering::Acquire) {
                        self.terminated.store(true, Ordering::Release);
                        self.cleanup();
                        self.actual.on_complete();
                        return true;
                    }
                    ready = false;
                }
            }

            if emitted == r || !ready {
                break;
            }

            let mut row = Vec::with_capacity(self.inners.len());
            for inner in &self.inners {
                match inner.queue.poll() {
                    Some(value) => row.push(value),
                    // The queues were checked non-empty and this drain is
                    // the only consumer
                    None => return false,
                }
            }

            self.actual.on_next((self.zipper)(row));
            emitted += 1;
            for inner in &self.inners {
                inner.replenish(1);
            }
        }

        if emitted != 0 {
            produced(&self.requested, emitted);
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
        let error = self.error.lock().take();
        if let Some(error) = error {
            self.terminated.store(true, Ordering::Release);
            self.cleanup();
            self.actual.on_error(error);
            return true;
        }
        false
    }

    fn cleanup(&self) {
        if self.cleaned_up.swap(true, Ordering::AcqRel) {
            return;
        }
        for inner in &self.inners {
            inner.upstream.cancel();
            inner.queue.clear();
        }
    }
}

impl<T, R, F> Subscription for ZipCoordinator<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(Vec<T>) -> R + Send + Sync + 'static,
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

impl<T, R, F> ZipInner<T, R, F> {
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

impl<T, R, F> Subscriber<T> for ZipInner<T, R, F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(Vec<T>) -> R + Send + Sync + 'static,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.upstream.set_once(subscription) {
            self.upstream.request(self.queue.capacity() as u64);
        }
    }

    fn on_next(&self, value: T) {
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
            self.done.store(true, Ordering::Release);
            parent.record_error(FreshetError::overflow("zip inner queue"));
        }
    }

    fn on_error(&self, error: FreshetError) {
        let Some(parent) = self.parent.upgrade() else {
            return;
        };
        if self.done.swap(true, Ordering::AcqRel) {
            hooks::on_error_dropped(&error);
            return;
        }
        parent.record_error(error);
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
