// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Source emitting the items of an iterator under backpressure.

use freshet_core::{
    add_demand, validate_demand, EmptySubscription, Publisher, Subscriber, Subscription, UNBOUNDED,
};
use parking_lot::Mutex;
use std::iter::Peekable;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Emit every item of `iter` in order, then complete.
///
/// The iterable is cloned for each subscription, so every subscriber
/// observes the full sequence.
///
/// ```
/// use freshet_stream::from_iter;
///
/// let letters = from_iter(vec!['a', 'b', 'c']);
/// ```
#[must_use]
pub fn from_iter<I>(iter: I) -> FromIter<I>
where
    I: IntoIterator + Clone,
{
    FromIter { iter }
}

/// See [`from_iter`].
pub struct FromIter<I> {
    iter: I,
}

impl<T, I> Publisher<T> for FromIter<I>
where
    T: Send + 'static,
    I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    I::IntoIter: Send + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let mut iter = self.iter.clone().into_iter().peekable();
        if iter.peek().is_none() {
            EmptySubscription::complete(&*subscriber);
            return;
        }
        let subscription = Arc::new(IterSubscription {
            actual: Arc::clone(&subscriber),
            iter: Mutex::new(iter),
            requested: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        });
        subscriber.on_subscribe(subscription);
    }
}

struct IterSubscription<T, I: Iterator<Item = T>> {
    actual: Arc<dyn Subscriber<T>>,
    /// Only the emitting thread advances the iterator.
    iter: Mutex<Peekable<I>>,
    requested: AtomicU64,
    cancelled: AtomicBool,
}

impl<T, I> IterSubscription<T, I>
where
    T: Send + 'static,
    I: Iterator<Item = T> + Send + 'static,
{
    fn fast_path(&self) {
        loop {
            if self.cancelled.load(Ordering::Acquire) {
                return;
            }
            let value = self.iter.lock().next();
            match value {
                Some(value) => self.actual.on_next(value),
                None => {
                    if !self.cancelled.swap(true, Ordering::AcqRel) {
                        self.actual.on_complete();
                    }
                    return;
                }
            }
        }
    }

    fn slow_path(&self, mut n: u64) {
        let mut emitted = 0u64;
        loop {
            while emitted != n {
                if self.cancelled.load(Ordering::Acquire) {
                    return;
                }
                let (value, exhausted) = {
                    let mut iter = self.iter.lock();
                    let value = iter.next();
                    let exhausted = iter.peek().is_none();
                    (value, exhausted)
                };
                match value {
                    Some(value) => {
                        self.actual.on_next(value);
                        emitted += 1;
                    }
                    None => {}
                }
                if exhausted {
                    if !self.cancelled.swap(true, Ordering::AcqRel) {
                        self.actual.on_complete();
                    }
                    return;
                }
            }

            n = self.requested.load(Ordering::Acquire);
            if n == emitted {
                let previous = self.requested.fetch_sub(emitted, Ordering::AcqRel);
                n = previous - emitted;
                if n == 0 {
                    return;
                }
                emitted = 0;
            }
        }
    }
}

impl<T, I> Subscription for IterSubscription<T, I>
where
    T: Send + 'static,
    I: Iterator<Item = T> + Send + 'static,
{
    fn request(&self, n: u64) {
        if !validate_demand(n) {
            return;
        }
        if add_demand(&self.requested, n) == 0 {
            if n == UNBOUNDED {
                self.fast_path();
            } else {
                self.slow_path(n);
            }
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
