// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Subscription arbiter for operators that switch upstreams serially.
//!
//! `concat` subscribes to one source at a time while presenting a single
//! subscription to its downstream. The arbiter owns that seam: it tracks the
//! outstanding demand across upstream switches, deducts what the finished
//! upstream produced, and requests the remainder from the next one.
//!
//! Requests, produced-counts and replacement subscriptions may arrive from
//! any thread; they are parked in "missed" fields and applied by whichever
//! caller wins the work-in-progress counter, so the current subscription and
//! its demand are only ever touched by one thread at a time.

use crate::backpressure::{add_cap, UNBOUNDED};
use crate::subscriber::Subscription;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

struct ArbiterState {
    subscription: Option<Arc<dyn Subscription>>,
    requested: u64,
}

/// Demand-preserving switch between serially-active upstream subscriptions.
pub struct SubscriptionArbiter {
    /// Drain-owned state; only the wip winner touches it.
    current: Mutex<ArbiterState>,
    missed_subscription: Mutex<Option<Arc<dyn Subscription>>>,
    missed_requested: AtomicU64,
    missed_produced: AtomicU64,
    wip: AtomicU32,
    cancelled: AtomicBool,
}

impl SubscriptionArbiter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Mutex::new(ArbiterState {
                subscription: None,
                requested: 0,
            }),
            missed_subscription: Mutex::new(None),
            missed_requested: AtomicU64::new(0),
            missed_produced: AtomicU64::new(0),
            wip: AtomicU32::new(0),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Install the next active upstream.
    ///
    /// The remaining demand (outstanding minus produced) is requested from it
    /// once the switch is applied. A superseded not-yet-applied subscription
    /// is cancelled.
    pub fn set(&self, subscription: Arc<dyn Subscription>) {
        if self.cancelled.load(Ordering::Acquire) {
            subscription.cancel();
            return;
        }
        let superseded = self.missed_subscription.lock().replace(subscription);
        if let Some(old) = superseded {
            old.cancel();
        }
        self.drain();
    }

    /// Add `n` to the outstanding demand and forward it to the active
    /// upstream.
    pub fn request(&self, n: u64) {
        crate::backpressure::add_demand(&self.missed_requested, n);
        self.drain();
    }

    /// Deduct `n` values the finishing upstream delivered downstream.
    pub fn produced(&self, n: u64) {
        crate::backpressure::add_demand(&self.missed_produced, n);
        self.drain();
    }

    /// Cancel the arbiter and the active upstream. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.drain();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }

        let mut missed = 1u32;
        loop {
            self.drain_once();

            let wip = self.wip.fetch_sub(missed, Ordering::AcqRel);
            if wip == missed {
                return;
            }
            missed = wip - missed;
        }
    }

    fn drain_once(&self) {
        let incoming = self.missed_subscription.lock().take();
        let requested = self.missed_requested.swap(0, Ordering::AcqRel);
        let produced = self.missed_produced.swap(0, Ordering::AcqRel);

        if self.cancelled.load(Ordering::Acquire) {
            let active = self.current.lock().subscription.take();
            if let Some(s) = active {
                s.cancel();
            }
            if let Some(s) = incoming {
                s.cancel();
            }
            return;
        }

        let mut state = self.current.lock();

        if requested != 0 {
            state.requested = add_cap(state.requested, requested);
        }
        if produced != 0 && state.requested != UNBOUNDED {
            state.requested = state.requested.saturating_sub(produced);
        }

        let mut target: Option<(Arc<dyn Subscription>, u64)> = None;

        if let Some(next) = incoming {
            // A finished upstream never needs cancelling; it is simply
            // replaced by its successor.
            state.subscription = Some(Arc::clone(&next));
            if state.requested != 0 {
                target = Some((next, state.requested));
            }
        } else if requested != 0 {
            if let Some(active) = &state.subscription {
                target = Some((Arc::clone(active), requested));
            }
        }

        drop(state);

        if let Some((subscription, n)) = target {
            subscription.request(n);
        }
    }
}

impl Default for SubscriptionArbiter {
    fn default() -> Self {
        Self::new()
    }
}
