// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Recording subscriber with assertions and cross-thread awaits.

use freshet_core::{FreshetError, Subscriber, Subscription, SubscriptionSlot, UNBOUNDED};
use parking_lot::{Condvar, Mutex};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Recorded<T> {
    values: Vec<T>,
    errors: Vec<FreshetError>,
    completions: usize,
    subscribed: bool,
}

/// Subscriber that records everything it observes.
///
/// Construct with an initial request ([`unbounded`](TestSubscriber::unbounded)
/// or [`with_request`](TestSubscriber::with_request)), subscribe it, then
/// assert on the recorded signals. The await helpers block the test thread
/// until a condition holds or the timeout passes, for pipelines that emit
/// from other threads.
pub struct TestSubscriber<T> {
    recorded: Mutex<Recorded<T>>,
    signal: Condvar,
    upstream: SubscriptionSlot,
    initial_request: u64,
}

impl<T: Send + 'static> TestSubscriber<T> {
    /// Subscriber requesting unbounded demand on subscription.
    #[must_use]
    pub fn unbounded() -> Arc<Self> {
        Self::with_request(UNBOUNDED)
    }

    /// Subscriber requesting `initial_request` on subscription; pass 0 to
    /// start without demand.
    #[must_use]
    pub fn with_request(initial_request: u64) -> Arc<Self> {
        Arc::new(Self {
            recorded: Mutex::new(Recorded {
                values: Vec::new(),
                errors: Vec::new(),
                completions: 0,
                subscribed: false,
            }),
            signal: Condvar::new(),
            upstream: SubscriptionSlot::new(),
            initial_request,
        })
    }

    /// Request more demand from the subscribed upstream.
    pub fn request(&self, n: u64) {
        self.upstream.request(n);
    }

    /// Cancel the subscription.
    pub fn cancel(&self) {
        self.upstream.cancel();
    }

    #[must_use]
    pub fn value_count(&self) -> usize {
        self.recorded.lock().values.len()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.recorded.lock().errors.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.recorded.lock().completions != 0
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.recorded.lock().subscribed
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        let recorded = self.recorded.lock();
        recorded.completions != 0 || !recorded.errors.is_empty()
    }

    pub fn errors(&self) -> Vec<FreshetError> {
        self.recorded.lock().errors.clone()
    }

    /// Block until a terminal signal arrives; `false` on timeout.
    #[must_use]
    pub fn await_terminal(&self, timeout: Duration) -> bool {
        self.await_while(timeout, |recorded| {
            recorded.completions == 0 && recorded.errors.is_empty()
        })
    }

    /// Block until at least `n` values arrived; `false` on timeout.
    #[must_use]
    pub fn await_value_count(&self, n: usize, timeout: Duration) -> bool {
        self.await_while(timeout, move |recorded| recorded.values.len() < n)
    }

    fn await_while(&self, timeout: Duration, wait_more: impl Fn(&Recorded<T>) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut recorded = self.recorded.lock();
        while wait_more(&recorded) {
            if Instant::now() >= deadline {
                return false;
            }
            let _ = self.signal.wait_until(&mut recorded, deadline);
        }
        true
    }

    pub fn assert_value_count(&self, expected: usize) {
        let actual = self.value_count();
        assert_eq!(
            actual, expected,
            "expected {expected} values, observed {actual}"
        );
    }

    pub fn assert_complete(&self) {
        let recorded = self.recorded.lock();
        assert_eq!(
            recorded.completions, 1,
            "expected exactly one completion, observed {}",
            recorded.completions
        );
        assert!(
            recorded.errors.is_empty(),
            "expected completion without errors, observed {:?}",
            recorded.errors
        );
    }

    pub fn assert_not_complete(&self) {
        let completions = self.recorded.lock().completions;
        assert_eq!(completions, 0, "expected no completion yet");
    }

    pub fn assert_no_errors(&self) {
        let errors = self.errors();
        assert!(errors.is_empty(), "expected no errors, observed {errors:?}");
    }

    pub fn assert_error_count(&self, expected: usize) {
        let actual = self.error_count();
        assert_eq!(
            actual, expected,
            "expected {expected} errors, observed {actual}"
        );
    }

    /// Assert exactly one error arrived and it matches `predicate`.
    pub fn assert_error(&self, predicate: impl Fn(&FreshetError) -> bool) {
        let errors = self.errors();
        assert_eq!(
            errors.len(),
            1,
            "expected exactly one error, observed {errors:?}"
        );
        assert!(
            predicate(&errors[0]),
            "error did not match: {:?}",
            errors[0]
        );
    }
}

impl<T: Clone + Send + 'static> TestSubscriber<T> {
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.recorded.lock().values.clone()
    }
}

impl<T: Clone + Debug + PartialEq + Send + 'static> TestSubscriber<T> {
    pub fn assert_values(&self, expected: &[T]) {
        let actual = self.values();
        assert_eq!(actual, expected, "unexpected value sequence");
    }
}

impl<T: Send + 'static> Subscriber<T> for TestSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.upstream.set_once(subscription) {
            {
                let mut recorded = self.recorded.lock();
                recorded.subscribed = true;
            }
            self.signal.notify_all();
            if self.initial_request != 0 {
                self.upstream.request(self.initial_request);
            }
        }
    }

    fn on_next(&self, value: T) {
        self.recorded.lock().values.push(value);
        self.signal.notify_all();
    }

    fn on_error(&self, error: FreshetError) {
        self.recorded.lock().errors.push(error);
        self.signal.notify_all();
    }

    fn on_complete(&self) {
        self.recorded.lock().completions += 1;
        self.signal.notify_all();
    }
}
