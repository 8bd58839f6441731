// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use freshet_core::{FreshetError, Publisher, SpscArrayQueue};
use freshet_stream::prelude::*;
use freshet_test_utils::{ManualScheduler, TestSubscriber};
use std::sync::Arc;

#[test]
fn test_nothing_is_delivered_until_the_scheduler_runs() {
    // Arrange
    let scheduler = ManualScheduler::new();
    let subscriber = TestSubscriber::unbounded();

    // Act
    range(1, 5)
        .observe_on(scheduler.clone())
        .subscribe(subscriber.clone());

    // Assert
    subscriber.assert_values(&[]);
    assert!(scheduler.pending() > 0);

    scheduler.run_all();
    subscriber.assert_values(&[1, 2, 3, 4, 5]);
    subscriber.assert_complete();
}

#[test]
fn test_order_is_preserved_across_the_boundary() {
    let scheduler = ManualScheduler::new();
    let subscriber = TestSubscriber::unbounded();
    range(1, 500)
        .observe_on_with(scheduler.clone(), 32, false, Arc::new(SpscArrayQueue::new))
        .subscribe(subscriber.clone());

    scheduler.run_all();

    let expected: Vec<i64> = (1..=500).collect();
    subscriber.assert_values(&expected);
    subscriber.assert_complete();
}

#[test]
fn test_demand_is_respected_across_the_boundary() {
    let scheduler = ManualScheduler::new();
    let subscriber = TestSubscriber::with_request(3);
    range(1, 100)
        .observe_on_with(scheduler.clone(), 16, false, Arc::new(SpscArrayQueue::new))
        .subscribe(subscriber.clone());

    scheduler.run_all();
    subscriber.assert_values(&[1, 2, 3]);
    subscriber.assert_not_complete();

    subscriber.request(4);
    scheduler.run_all();
    subscriber.assert_values(&[1, 2, 3, 4, 5, 6, 7]);
    subscriber.assert_not_complete();
}

#[test]
fn test_prefetch_bounds_upstream_demand() {
    let scheduler = ManualScheduler::new();
    let subscriber = TestSubscriber::with_request(0);

    // A 1000-element source against a prefetch of 8: only the prefetch may
    // be pulled while the downstream requests nothing
    let probe = Arc::new(DemandProbe::default());
    let probe_source = ProbeSource {
        inner: range(1, 1000).into_dyn(),
        probe: probe.clone(),
    };
    probe_source
        .observe_on_with(scheduler.clone(), 8, false, Arc::new(SpscArrayQueue::new))
        .subscribe(subscriber.clone());
    scheduler.run_all();

    assert_eq!(probe.total(), 8);
    subscriber.assert_values(&[]);
}

#[test]
fn test_error_cuts_past_buffered_values_without_delay() {
    let scheduler = ManualScheduler::new();
    let subscriber = TestSubscriber::with_request(0);
    let source = concat_array(vec![
        range(1, 3).into_dyn(),
        fail::<i64>(FreshetError::stream("late error")).into_dyn(),
    ]);

    source
        .observe_on_with(scheduler.clone(), 32, false, Arc::new(SpscArrayQueue::new))
        .subscribe(subscriber.clone());
    scheduler.run_all();

    // No demand was ever granted: the error overtakes the buffered 1, 2, 3
    subscriber.assert_values(&[]);
    subscriber.assert_error_count(1);
}

#[test]
fn test_delay_error_drains_the_queue_first() {
    let scheduler = ManualScheduler::new();
    let subscriber = TestSubscriber::unbounded();
    let source = concat_array(vec![
        range(1, 3).into_dyn(),
        fail::<i64>(FreshetError::stream("late error")).into_dyn(),
    ]);

    source
        .observe_on_with(scheduler.clone(), 32, true, Arc::new(SpscArrayQueue::new))
        .subscribe(subscriber.clone());
    scheduler.run_all();

    subscriber.assert_values(&[1, 2, 3]);
    subscriber.assert_error_count(1);
    subscriber.assert_not_complete();
}

#[test]
fn test_rejected_scheduler_errors_the_stream() {
    let scheduler = ManualScheduler::new();
    scheduler.set_reject(true);
    let subscriber = TestSubscriber::unbounded();

    range(1, 3)
        .observe_on(scheduler.clone())
        .subscribe(subscriber.clone());

    subscriber.assert_error(|error| error.is_rejected());
}

#[test]
fn test_cancel_drops_buffered_values() {
    let scheduler = ManualScheduler::new();
    let subscriber = TestSubscriber::with_request(0);
    range(1, 100)
        .observe_on_with(scheduler.clone(), 16, false, Arc::new(SpscArrayQueue::new))
        .subscribe(subscriber.clone());

    subscriber.cancel();
    scheduler.run_all();

    subscriber.assert_values(&[]);
    subscriber.assert_not_complete();
    subscriber.assert_no_errors();
}

/// Counts the demand a downstream operator sends upstream.
#[derive(Default)]
struct DemandProbe {
    total: std::sync::atomic::AtomicU64,
}

impl DemandProbe {
    fn total(&self) -> u64 {
        self.total.load(std::sync::atomic::Ordering::SeqCst)
    }
}

struct ProbeSource {
    inner: Arc<dyn Publisher<i64>>,
    probe: Arc<DemandProbe>,
}

impl Publisher<i64> for ProbeSource {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<i64>>) {
        let probe = self.probe.clone();
        self.inner.subscribe(Arc::new(ProbeSubscriber { probe, actual: subscriber }));
    }
}

struct ProbeSubscriber {
    probe: Arc<DemandProbe>,
    actual: Arc<dyn Subscriber<i64>>,
}

impl Subscriber<i64> for ProbeSubscriber {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let probe = self.probe.clone();
        self.actual.on_subscribe(Arc::new(ProbeSubscription {
            probe,
            inner: subscription,
        }));
    }

    fn on_next(&self, value: i64) {
        self.actual.on_next(value);
    }

    fn on_error(&self, error: FreshetError) {
        self.actual.on_error(error);
    }

    fn on_complete(&self) {
        self.actual.on_complete();
    }
}

struct ProbeSubscription {
    probe: Arc<DemandProbe>,
    inner: Arc<dyn Subscription>,
}

impl Subscription for ProbeSubscription {
    fn request(&self, n: u64) {
        self.probe
            .total
            .fetch_add(n, std::sync::atomic::Ordering::SeqCst);
        self.inner.request(n);
    }

    fn cancel(&self) {
        self.inner.cancel();
    }
}
