// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Groups consecutive source values into buffers and emits the buffers.
//!
//! # Overview
//!
//! The relation between `size` and `skip` selects the strategy:
//!
//! - `size == skip`, **exact**: back-to-back buffers of `size` elements.
//! - `skip > size`, **skipping**: `size` elements are collected, then
//!   `skip - size` are dropped before the next buffer starts.
//! - `skip < size`, **overlapping**: a new buffer starts every `skip`
//!   elements, so an element may belong to several buffers.
//!
//! A partial buffer is emitted on completion. The overlapping strategy may
//! complete with several buffers still queued; replaying them against late
//! requests goes through the post-complete drain
//! ([`freshet_core::drain`]).
//!
//! # Error Handling
//!
//! An upstream error discards all collected buffers and propagates
//! immediately.

use freshet_core::drain;
use freshet_core::{
    add_cap, hooks, multiply_cap, produced, validate_demand, FreshetError, Publisher, Subscriber,
    Subscription, SubscriptionSlot,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// See [`PublisherExt::buffer`](crate::PublisherExt::buffer).
pub struct Buffer<P, S> {
    source: P,
    size: usize,
    skip: usize,
    supplier: S,
}

impl<P, S> Buffer<P, S> {
    pub(crate) fn new(source: P, size: usize, skip: usize, supplier: S) -> Self {
        assert!(size > 0, "buffer size must be at least 1");
        assert!(skip > 0, "buffer skip must be at least 1");
        Self {
            source,
            size,
            skip,
            supplier,
        }
    }
}

impl<T, P, S> Publisher<Vec<T>> for Buffer<P, S>
where
    T: Clone + Send + 'static,
    P: Publisher<T>,
    S: Fn() -> Vec<T> + Send + Sync + Clone + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<Vec<T>>>) {
        let supplier = self.supplier.clone();
        if self.size == self.skip {
            let size = self.size;
            let subscriber =
                Arc::new_cyclic(|me: &Weak<BufferExactSubscriber<T, S>>| BufferExactSubscriber {
                    me: me.clone(),
                    actual: subscriber,
                    supplier,
                    size,
                    buffer: Mutex::new(None),
                    upstream: SubscriptionSlot::new(),
                    done: AtomicBool::new(false),
                });
            self.source.subscribe(subscriber);
        } else if self.skip > self.size {
            let (size, skip) = (self.size, self.skip);
            let subscriber =
                Arc::new_cyclic(|me: &Weak<BufferSkipSubscriber<T, S>>| BufferSkipSubscriber {
                    me: me.clone(),
                    actual: subscriber,
                    supplier,
                    size,
                    skip,
                    state: Mutex::new(SkipState {
                        buffer: None,
                        index: 0,
                    }),
                    first_request: AtomicBool::new(false),
                    upstream: SubscriptionSlot::new(),
                    done: AtomicBool::new(false),
                });
            self.source.subscribe(subscriber);
        } else {
            let (size, skip) = (self.size, self.skip);
            let subscriber = Arc::new_cyclic(|me: &Weak<BufferOverlapSubscriber<T, S>>| {
                BufferOverlapSubscriber {
                    me: me.clone(),
                    actual: subscriber,
                    supplier,
                    size,
                    skip,
                    index: Mutex::new(0),
                    buffers: Mutex::new(VecDeque::new()),
                    requested: AtomicU64::new(0),
                    first_request: AtomicBool::new(false),
                    upstream: SubscriptionSlot::new(),
                    cancelled: AtomicBool::new(false),
                    done: AtomicBool::new(false),
                }
            });
            self.source.subscribe(subscriber);
        }
    }
}

struct BufferExactSubscriber<T, S> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<Vec<T>>>,
    supplier: S,
    size: usize,
    buffer: Mutex<Option<Vec<T>>>,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T, S> Subscriber<T> for BufferExactSubscriber<T, S>
where
    T: Send + 'static,
    S: Fn() -> Vec<T> + Send + Sync + 'static,
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
        let full = {
            let mut guard = self.buffer.lock();
            let buffer = guard.get_or_insert_with(&self.supplier);
            buffer.push(value);
            if buffer.len() == self.size {
                guard.take()
            } else {
                None
            }
        };
        if let Some(full) = full {
            self.actual.on_next(full);
        }
    }

    fn on_error(&self, error: FreshetError) {
        if self.done.swap(true, Ordering::AcqRel) {
            hooks::on_error_dropped(&error);
            return;
        }
        self.buffer.lock().take();
        self.actual.on_error(error);
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        let partial = self.buffer.lock().take();
        if let Some(partial) = partial {
            if !partial.is_empty() {
                self.actual.on_next(partial);
            }
        }
        self.actual.on_complete();
    }
}

impl<T, S> Subscription for BufferExactSubscriber<T, S>
where
    T: Send + 'static,
    S: Fn() -> Vec<T> + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if validate_demand(n) {
            self.upstream.request(multiply_cap(n, self.size as u64));
        }
    }

    fn cancel(&self) {
        self.upstream.cancel();
    }
}

struct SkipState<T> {
    buffer: Option<Vec<T>>,
    index: u64,
}

struct BufferSkipSubscriber<T, S> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<Vec<T>>>,
    supplier: S,
    size: usize,
    skip: usize,
    state: Mutex<SkipState<T>>,
    first_request: AtomicBool,
    upstream: SubscriptionSlot,
    done: AtomicBool,
}

impl<T, S> Subscriber<T> for BufferSkipSubscriber<T, S>
where
    T: Send + 'static,
    S: Fn() -> Vec<T> + Send + Sync + 'static,
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
        let full = {
            let mut state = self.state.lock();
            if state.index % self.skip as u64 == 0 {
                state.buffer = Some((self.supplier)());
            }
            state.index += 1;
            match &mut state.buffer {
                Some(buffer) => {
                    buffer.push(value);
                    if buffer.len() == self.size {
                        state.buffer.take()
                    } else {
                        None
                    }
                }
                // In the gap between buffers
                None => None,
            }
        };
        if let Some(full) = full {
            self.actual.on_next(full);
        }
    }

    fn on_error(&self, error: FreshetError) {
        if self.done.swap(true, Ordering::AcqRel) {
            hooks::on_error_dropped(&error);
            return;
        }
        self.state.lock().buffer.take();
        self.actual.on_error(error);
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        let partial = self.state.lock().buffer.take();
        if let Some(partial) = partial {
            self.actual.on_next(partial);
        }
        self.actual.on_complete();
    }
}

impl<T, S> Subscription for BufferSkipSubscriber<T, S>
where
    T: Send + 'static,
    S: Fn() -> Vec<T> + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if !validate_demand(n) {
            return;
        }
        if self.first_request.swap(true, Ordering::AcqRel) {
            // n buffers plus their gaps
            self.upstream.request(multiply_cap(self.skip as u64, n));
        } else {
            // n full buffers plus the (n - 1) gaps between them
            let buffers = multiply_cap(n, self.size as u64);
            let gaps = multiply_cap((self.skip - self.size) as u64, n.saturating_sub(1));
            self.upstream.request(add_cap(buffers, gaps));
        }
    }

    fn cancel(&self) {
        self.upstream.cancel();
    }
}

struct BufferOverlapSubscriber<T, S> {
    me: Weak<Self>,
    actual: Arc<dyn Subscriber<Vec<T>>>,
    supplier: S,
    size: usize,
    skip: usize,
    index: Mutex<u64>,
    buffers: Mutex<VecDeque<Vec<T>>>,
    /// Demand-with-completion field driven by the post-complete drain.
    requested: AtomicU64,
    first_request: AtomicBool,
    upstream: SubscriptionSlot,
    cancelled: AtomicBool,
    done: AtomicBool,
}

impl<T, S> Subscriber<T> for BufferOverlapSubscriber<T, S>
where
    T: Clone + Send + 'static,
    S: Fn() -> Vec<T> + Send + Sync + 'static,
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

        {
            let mut index = self.index.lock();
            if *index % self.skip as u64 == 0 {
                self.buffers.lock().push_back((self.supplier)());
            }
            *index += 1;
        }

        // The front buffer fills first; emit it as soon as this value tops
        // it up, then feed every younger buffer.
        let full = {
            let mut buffers = self.buffers.lock();
            if buffers
                .front()
                .is_some_and(|buffer| buffer.len() + 1 == self.size)
            {
                let mut full = buffers.pop_front().unwrap_or_default();
                full.push(value.clone());
                Some(full)
            } else {
                None
            }
        };
        if let Some(full) = full {
            self.actual.on_next(full);
            produced(&self.requested, 1);
        }

        let mut buffers = self.buffers.lock();
        for buffer in buffers.iter_mut() {
            buffer.push(value.clone());
        }
    }

    fn on_error(&self, error: FreshetError) {
        if self.done.swap(true, Ordering::AcqRel) {
            hooks::on_error_dropped(&error);
            return;
        }
        self.buffers.lock().clear();
        self.actual.on_error(error);
    }

    fn on_complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        drain::post_complete(&self.actual, &self.buffers, &self.requested, &self.cancelled);
    }
}

impl<T, S> Subscription for BufferOverlapSubscriber<T, S>
where
    T: Clone + Send + 'static,
    S: Fn() -> Vec<T> + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if !validate_demand(n) {
            return;
        }
        if drain::post_complete_request(n, &self.actual, &self.buffers, &self.requested, &self.cancelled)
        {
            return;
        }
        if self.first_request.swap(true, Ordering::AcqRel) {
            // n more buffer starts
            self.upstream.request(multiply_cap(self.skip as u64, n));
        } else {
            // one full buffer plus (n - 1) later starts
            let later = multiply_cap(self.skip as u64, n.saturating_sub(1));
            self.upstream.request(add_cap(self.size as u64, later));
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.upstream.cancel();
    }
}
