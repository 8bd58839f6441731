// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use freshet_core::{validate_demand, Subscription, SubscriptionSlot};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct CountingSubscription {
    requests: Mutex<Vec<u64>>,
    cancels: AtomicUsize,
}

impl Subscription for CountingSubscription {
    fn request(&self, n: u64) {
        self.requests.lock().push(n);
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_validate_demand() {
    assert!(validate_demand(1));
    assert!(validate_demand(u64::MAX));
    assert!(!validate_demand(0));
}

#[test]
fn test_slot_forwards_requests_once_set() {
    let slot = SubscriptionSlot::new();
    let upstream = Arc::new(CountingSubscription::default());

    // Requests before the upstream arrives go nowhere
    slot.request(1);
    assert!(slot.set_once(upstream.clone()));
    slot.request(5);
    slot.request(7);

    assert_eq!(*upstream.requests.lock(), vec![5, 7]);
}

#[test]
fn test_slot_rejects_second_subscription() {
    let slot = SubscriptionSlot::new();
    let first = Arc::new(CountingSubscription::default());
    let second = Arc::new(CountingSubscription::default());

    assert!(slot.set_once(first.clone()));
    assert!(!slot.set_once(second.clone()));

    // The double-subscriber is cancelled, the original untouched
    assert_eq!(second.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(first.cancels.load(Ordering::SeqCst), 0);
}

#[test]
fn test_slot_cancel_is_idempotent_and_reaches_upstream_once() {
    let slot = SubscriptionSlot::new();
    let upstream = Arc::new(CountingSubscription::default());
    assert!(slot.set_once(upstream.clone()));

    slot.cancel();
    slot.cancel();
    slot.cancel();

    assert_eq!(upstream.cancels.load(Ordering::SeqCst), 1);
    assert!(slot.is_cancelled());
}

#[test]
fn test_slot_cancelled_before_set_cancels_incoming() {
    let slot = SubscriptionSlot::new();
    slot.cancel();

    let late = Arc::new(CountingSubscription::default());
    assert!(!slot.set_once(late.clone()));
    assert_eq!(late.cancels.load(Ordering::SeqCst), 1);
}

#[test]
fn test_slot_get_snapshots_active_subscription() {
    let slot = SubscriptionSlot::new();
    assert!(slot.get().is_none());
    let upstream = Arc::new(CountingSubscription::default());
    slot.set_once(upstream);
    assert!(slot.get().is_some());
    slot.cancel();
    assert!(slot.get().is_none());
}
