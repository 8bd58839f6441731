// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Properties of the subscription contract, checked over real pipelines.

use freshet::prelude::*;
use freshet::hooks;
use freshet_test_utils::TestSubscriber;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Wraps a source and counts the cancels that reach it.
struct CancelProbe<T> {
    inner: Arc<dyn Publisher<T>>,
    cancels: Arc<AtomicUsize>,
}

impl<T: Send + 'static> Publisher<T> for CancelProbe<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let cancels = Arc::clone(&self.cancels);
        let inner_subscriber = Arc::new(ProbeSubscriber {
            actual: subscriber,
            cancels,
        });
        self.inner.subscribe(inner_subscriber);
    }
}

struct ProbeSubscriber<T> {
    actual: Arc<dyn Subscriber<T>>,
    cancels: Arc<AtomicUsize>,
}

impl<T: Send + 'static> Subscriber<T> for ProbeSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        let cancels = Arc::clone(&self.cancels);
        self.actual.on_subscribe(Arc::new(ProbeSubscription {
            inner: subscription,
            cancels,
        }));
    }

    fn on_next(&self, value: T) {
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
    inner: Arc<dyn Subscription>,
    cancels: Arc<AtomicUsize>,
}

impl Subscription for ProbeSubscription {
    fn request(&self, n: u64) {
        self.inner.request(n);
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.inner.cancel();
    }
}

#[test]
fn test_emissions_never_exceed_requested_demand() {
    let subscriber = TestSubscriber::with_request(0);
    range(1, 1_000).subscribe(subscriber.clone());

    subscriber.assert_value_count(0);
    subscriber.request(3);
    subscriber.assert_value_count(3);
    subscriber.request(2);
    subscriber.assert_value_count(5);
    subscriber.assert_not_complete();
}

#[test]
fn test_no_signal_after_terminal() {
    let processor = MulticastProcessor::new();
    let subscriber = TestSubscriber::unbounded();
    processor.subscribe(subscriber.clone());

    processor.on_next(1);
    processor.on_complete();
    processor.on_next(2);
    processor.on_complete();
    processor.on_error(FreshetError::stream("after the fact"));

    subscriber.assert_values(&[1]);
    subscriber.assert_complete();
    subscriber.assert_no_errors();
}

#[test]
fn test_cancel_stops_emissions_and_reaches_upstream_once() {
    // Arrange
    let cancels = Arc::new(AtomicUsize::new(0));
    let probed = CancelProbe {
        inner: range(1, 100).into_dyn(),
        cancels: Arc::clone(&cancels),
    };
    let subscriber = TestSubscriber::with_request(2);

    // Act
    probed.map(|x| x + 1).subscribe(subscriber.clone());
    subscriber.assert_values(&[2, 3]);

    subscriber.cancel();
    subscriber.cancel();
    subscriber.request(50);

    // Assert
    subscriber.assert_values(&[2, 3]);
    subscriber.assert_not_complete();
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
}

#[test]
fn test_zero_request_is_reported_to_the_sink() {
    // Hooks are process-wide; capture and restore around the violation
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    hooks::set_error_dropped_hook(move |error| {
        sink.lock().push(error.to_string());
    });

    let subscriber = TestSubscriber::with_request(0);
    range(1, 10).subscribe(subscriber.clone());
    subscriber.request(0);

    hooks::reset_error_dropped_hook();

    let seen = seen.lock();
    assert!(
        seen.iter().any(|message| message.contains("positive")),
        "expected a protocol violation in the sink, saw {seen:?}"
    );
    subscriber.assert_value_count(0);
}

#[test]
fn test_double_subscribe_cancels_the_second_subscription() {
    struct SecondSubscription {
        cancels: Arc<AtomicUsize>,
    }
    impl Subscription for SecondSubscription {
        fn request(&self, _n: u64) {}
        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    let subscriber = TestSubscriber::<i64>::with_request(0);
    range(1, 3).subscribe(subscriber.clone());

    let cancels = Arc::new(AtomicUsize::new(0));
    // A rogue second on_subscribe must be cancelled, not installed
    subscriber.on_subscribe(Arc::new(SecondSubscription {
        cancels: Arc::clone(&cancels),
    }));
    assert_eq!(cancels.load(Ordering::SeqCst), 1);
}

#[test]
fn test_saturating_demand_accounting() {
    let subscriber = TestSubscriber::with_request(UNBOUNDED);
    range(1, 10).subscribe(subscriber.clone());
    // A second unbounded request must not overflow anything
    subscriber.request(UNBOUNDED);
    subscriber.assert_value_count(10);
    subscriber.assert_complete();
}
