// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Multicast processor: one upstream fanned out to many subscribers.
//!
//! # Overview
//!
//! The processor is both a subscriber and a publisher. Values pushed into it
//! (either directly or by an upstream it was subscribed to) are delivered
//! synchronously to every attached downstream with outstanding demand. A
//! downstream without demand at delivery time is removed and individually
//! signalled a lack-of-requests error; the others are unaffected.
//!
//! The subscriber list is copy-on-write under a mutex: delivery snapshots
//! the current list and never holds the lock while signalling. After a
//! terminal signal the list is swapped for a terminated sentinel and late
//! subscribers immediately receive the stored terminal.
//!
//! The processor applies no backpressure to its upstream: `on_subscribe`
//! requests unbounded demand, and the upstream handle is deliberately not
//! retained. A processor is never detached from its source by cancelling
//! it; wrap it if you need that.
//!
//! # Basic Usage
//!
//! ```
//! use freshet_core::{Publisher, Subscriber};
//! use freshet_stream::MulticastProcessor;
//! use freshet_test_utils::TestSubscriber;
//!
//! let processor = MulticastProcessor::new();
//! let subscriber = TestSubscriber::unbounded();
//! processor.subscribe(subscriber.clone());
//!
//! processor.on_next(1);
//! processor.on_complete();
//! subscriber.assert_values(&[1]);
//! subscriber.assert_complete();
//! ```

use freshet_core::{
    add_demand, hooks, produced, validate_demand, FreshetError, Publisher, Subscriber,
    Subscription, UNBOUNDED,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// See the [module documentation](self).
pub struct MulticastProcessor<T> {
    me: Weak<Self>,
    state: Mutex<MulticastState<T>>,
}

struct MulticastState<T> {
    subscribers: Vec<Arc<MulticastSubscription<T>>>,
    terminated: bool,
    error: Option<FreshetError>,
}

impl<T: Clone + Send + Sync + 'static> MulticastProcessor<T> {
    /// Create a processor with no subscribers.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            state: Mutex::new(MulticastState {
                subscribers: Vec::new(),
                terminated: false,
                error: None,
            }),
        })
    }

    /// Returns `true` once a terminal signal was dispatched.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    /// Number of currently attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() != 0
    }

    fn remove(&self, target: &MulticastSubscription<T>) {
        let mut state = self.state.lock();
        state
            .subscribers
            .retain(|s| !std::ptr::eq(Arc::as_ptr(s), target));
    }
}

impl<T: Clone + Send + Sync + 'static> Subscriber<T> for MulticastProcessor<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        // The handle is not retained: the processor never cancels its
        // upstream
        if self.state.lock().terminated {
            subscription.cancel();
        } else {
            subscription.request(UNBOUNDED);
        }
    }

    fn on_next(&self, value: T) {
        let snapshot = self.state.lock().subscribers.clone();
        for subscriber in snapshot {
            if subscriber.requested.load(Ordering::Acquire) != 0 {
                subscriber.actual.on_next(value.clone());
                produced(&subscriber.requested, 1);
            } else {
                self.remove(&subscriber);
                subscriber.actual.on_error(FreshetError::lack_of_demand(
                    "multicast subscriber fell behind",
                ));
            }
        }
    }

    fn on_error(&self, error: FreshetError) {
        let snapshot = {
            let mut state = self.state.lock();
            if state.terminated {
                drop(state);
                hooks::on_error_dropped(&error);
                return;
            }
            state.terminated = true;
            state.error = Some(error.clone());
            std::mem::take(&mut state.subscribers)
        };
        for subscriber in snapshot {
            subscriber.actual.on_error(error.clone());
        }
    }

    fn on_complete(&self) {
        let snapshot = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            state.terminated = true;
            std::mem::take(&mut state.subscribers)
        };
        for subscriber in snapshot {
            subscriber.actual.on_complete();
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> for MulticastProcessor<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let subscription = Arc::new(MulticastSubscription {
            actual: Arc::clone(&subscriber),
            parent: self.me.clone(),
            requested: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        });
        subscriber.on_subscribe(Arc::clone(&subscription) as Arc<dyn Subscription>);

        let stored_terminal = {
            let mut state = self.state.lock();
            if state.terminated {
                Terminal::from(state.error.clone())
            } else {
                state.subscribers.push(Arc::clone(&subscription));
                Terminal::None
            }
        };
        match stored_terminal {
            Terminal::None => {
                if subscription.cancelled.load(Ordering::Acquire) {
                    self.remove(&subscription);
                }
            }
            Terminal::Error(error) => subscriber.on_error(error),
            Terminal::Complete => subscriber.on_complete(),
        }
    }
}

enum Terminal {
    None,
    Error(FreshetError),
    Complete,
}

impl From<Option<FreshetError>> for Terminal {
    fn from(error: Option<FreshetError>) -> Self {
        match error {
            Some(error) => Terminal::Error(error),
            None => Terminal::Complete,
        }
    }
}

struct MulticastSubscription<T> {
    actual: Arc<dyn Subscriber<T>>,
    parent: Weak<MulticastProcessor<T>>,
    requested: AtomicU64,
    cancelled: AtomicBool,
}

impl<T: Clone + Send + Sync + 'static> Subscription for MulticastSubscription<T> {
    fn request(&self, n: u64) {
        if validate_demand(n) {
            add_demand(&self.requested, n);
        }
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(parent) = self.parent.upgrade() {
            parent.remove(self);
        }
    }
}
