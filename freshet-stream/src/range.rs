// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Source emitting a consecutive range of integers under backpressure.

use freshet_core::{
    add_demand, validate_demand, EmptySubscription, Publisher, Subscriber, Subscription, UNBOUNDED,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Emit `count` consecutive `i64` values starting at `start`.
///
/// ```
/// use freshet_stream::range;
///
/// let numbers = range(1, 5); // 1, 2, 3, 4, 5
/// ```
#[must_use]
pub fn range(start: i64, count: u64) -> Range {
    Range { start, count }
}

/// See [`range`].
pub struct Range {
    start: i64,
    count: u64,
}

impl Publisher<i64> for Range {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<i64>>) {
        if self.count == 0 {
            EmptySubscription::complete(&*subscriber);
            return;
        }
        let subscription = Arc::new(RangeSubscription {
            actual: Arc::clone(&subscriber),
            start: self.start,
            count: self.count,
            index: AtomicU64::new(0),
            requested: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        });
        subscriber.on_subscribe(subscription);
    }
}

struct RangeSubscription {
    actual: Arc<dyn Subscriber<i64>>,
    start: i64,
    count: u64,
    /// Next offset to emit; only touched by the emitting thread.
    index: AtomicU64,
    requested: AtomicU64,
    cancelled: AtomicBool,
}

impl RangeSubscription {
    fn fast_path(&self) {
        let mut i = self.index.load(Ordering::Relaxed);
        while i != self.count {
            if self.cancelled.load(Ordering::Acquire) {
                return;
            }
            self.actual.on_next(self.start.wrapping_add(i as i64));
            i += 1;
        }
        self.index.store(i, Ordering::Relaxed);
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.actual.on_complete();
        }
    }

    fn slow_path(&self, mut n: u64) {
        let mut emitted = 0u64;
        loop {
            let mut i = self.index.load(Ordering::Relaxed);
            while emitted != n && i != self.count {
                if self.cancelled.load(Ordering::Acquire) {
                    return;
                }
                self.actual.on_next(self.start.wrapping_add(i as i64));
                i += 1;
                emitted += 1;
            }
            self.index.store(i, Ordering::Relaxed);

            if i == self.count {
                if !self.cancelled.swap(true, Ordering::AcqRel) {
                    self.actual.on_complete();
                }
                return;
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

impl Subscription for RangeSubscription {
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
