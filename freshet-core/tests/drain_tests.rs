// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use freshet_core::drain::{post_complete, post_complete_request, COMPLETED_MASK};
use freshet_core::Subscriber;
use freshet_test_utils::TestSubscriber;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

fn queue_of(values: &[i32]) -> Mutex<VecDeque<i32>> {
    Mutex::new(values.iter().copied().collect())
}

fn downstream() -> (Arc<TestSubscriber<i32>>, Arc<dyn Subscriber<i32>>) {
    let subscriber = TestSubscriber::with_request(0);
    let erased: Arc<dyn Subscriber<i32>> = subscriber.clone();
    (subscriber, erased)
}

#[test]
fn test_post_complete_with_empty_queue_completes() {
    let (subscriber, erased) = downstream();
    let queue = queue_of(&[]);
    let state = AtomicU64::new(0);
    let cancelled = AtomicBool::new(false);

    post_complete(&erased, &queue, &state, &cancelled);

    subscriber.assert_values(&[]);
    subscriber.assert_complete();
}

#[test]
fn test_post_complete_without_demand_parks_the_queue() {
    let (subscriber, erased) = downstream();
    let queue = queue_of(&[1, 2, 3]);
    let state = AtomicU64::new(0);
    let cancelled = AtomicBool::new(false);

    post_complete(&erased, &queue, &state, &cancelled);

    // Nothing may be emitted yet; the completion bit is parked instead
    subscriber.assert_values(&[]);
    subscriber.assert_not_complete();
    assert_eq!(state.load(Ordering::SeqCst), COMPLETED_MASK);
}

#[test]
fn test_late_request_replays_buffered_items() {
    let (subscriber, erased) = downstream();
    let queue = queue_of(&[1, 2, 3]);
    let state = AtomicU64::new(0);
    let cancelled = AtomicBool::new(false);

    post_complete(&erased, &queue, &state, &cancelled);

    let handled = post_complete_request(2, &erased, &queue, &state, &cancelled);
    assert!(handled, "post-complete requests must not reach upstream");
    subscriber.assert_values(&[1, 2]);
    subscriber.assert_not_complete();

    let handled = post_complete_request(5, &erased, &queue, &state, &cancelled);
    assert!(handled);
    subscriber.assert_values(&[1, 2, 3]);
    subscriber.assert_complete();
}

#[test]
fn test_post_complete_with_outstanding_demand_drains_inline() {
    let (subscriber, erased) = downstream();
    let queue = queue_of(&[7, 8]);
    let state = AtomicU64::new(5);
    let cancelled = AtomicBool::new(false);

    post_complete(&erased, &queue, &state, &cancelled);

    subscriber.assert_values(&[7, 8]);
    subscriber.assert_complete();
}

#[test]
fn test_pre_complete_request_keeps_going_upstream() {
    let (_subscriber, erased) = downstream();
    let queue = queue_of(&[]);
    let state = AtomicU64::new(0);
    let cancelled = AtomicBool::new(false);

    let handled = post_complete_request(4, &erased, &queue, &state, &cancelled);
    assert!(!handled, "pre-complete requests still go upstream");
    assert_eq!(state.load(Ordering::SeqCst), 4);
}

#[test]
fn test_cancelled_drain_stops_replaying() {
    let (subscriber, erased) = downstream();
    let queue = queue_of(&[1, 2, 3]);
    let state = AtomicU64::new(0);
    let cancelled = AtomicBool::new(true);

    post_complete(&erased, &queue, &state, &cancelled);
    let _ = post_complete_request(10, &erased, &queue, &state, &cancelled);

    subscriber.assert_values(&[]);
    subscriber.assert_not_complete();
}
