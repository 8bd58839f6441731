// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Gatekeepers on the upstream boundary of every operator.
//!
//! [`validate_demand`] and [`SubscriptionSlot`] are the only two checks a
//! conforming operator performs against its upstream: request amounts must
//! be positive, and a subscription may be installed at most once. Both
//! violations are reported to the process-wide sink rather than signalled
//! downstream.

use crate::error::FreshetError;
use crate::hooks;
use crate::subscriber::{Subscriber, Subscription};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Returns `true` iff `n` is a valid request amount.
///
/// A zero request is a protocol violation: it is reported to the sink and
/// `false` is returned so the caller ignores it.
pub fn validate_demand(n: u64) -> bool {
    if n == 0 {
        hooks::on_error_dropped(&FreshetError::protocol(
            "request amount must be positive",
        ));
        return false;
    }
    true
}

enum SlotState {
    Empty,
    Active(Arc<dyn Subscription>),
    Cancelled,
}

/// Set-once, cancel-once holder for an operator's upstream subscription.
///
/// The slot enforces the single-subscription rule: a second `set_once`
/// cancels the incoming subscription and reports a double-subscribe
/// violation. Cancelling the slot cancels the installed subscription exactly
/// once and swallows any subscription installed afterwards.
pub struct SubscriptionSlot {
    state: Mutex<SlotState>,
}

impl SubscriptionSlot {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Empty),
        }
    }

    /// Install `incoming` if the slot is still empty.
    ///
    /// Returns `true` on success. A slot that is already active cancels
    /// `incoming` and reports the violation; a cancelled slot cancels
    /// `incoming` silently.
    pub fn set_once(&self, incoming: Arc<dyn Subscription>) -> bool {
        let mut state = self.state.lock();
        match &*state {
            SlotState::Empty => {
                *state = SlotState::Active(incoming);
                true
            }
            SlotState::Active(_) => {
                drop(state);
                incoming.cancel();
                hooks::on_error_dropped(&FreshetError::protocol(
                    "subscription already set",
                ));
                false
            }
            SlotState::Cancelled => {
                drop(state);
                incoming.cancel();
                false
            }
        }
    }

    /// Forward `n` to the installed subscription, if any.
    pub fn request(&self, n: u64) {
        let current = match &*self.state.lock() {
            SlotState::Active(s) => Some(Arc::clone(s)),
            _ => None,
        };
        if let Some(s) = current {
            s.request(n);
        }
    }

    /// Cancel the slot and whatever is installed in it. Idempotent.
    pub fn cancel(&self) {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, SlotState::Cancelled)
        };
        if let SlotState::Active(s) = previous {
            s.cancel();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(&*self.state.lock(), SlotState::Cancelled)
    }

    /// Snapshot the installed subscription.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn Subscription>> {
        match &*self.state.lock() {
            SlotState::Active(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }
}

impl Default for SubscriptionSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscription of a source that terminates at subscribe time.
///
/// Requests are validated and discarded; cancel is a no-op.
pub struct EmptySubscription;

impl Subscription for EmptySubscription {
    fn request(&self, n: u64) {
        let _ = validate_demand(n);
    }

    fn cancel(&self) {}
}

impl EmptySubscription {
    /// Deliver `on_subscribe` followed by `on_complete`.
    pub fn complete<T>(subscriber: &dyn Subscriber<T>) {
        subscriber.on_subscribe(Arc::new(EmptySubscription));
        subscriber.on_complete();
    }

    /// Deliver `on_subscribe` followed by `on_error`.
    pub fn error<T>(subscriber: &dyn Subscriber<T>, error: FreshetError) {
        subscriber.on_subscribe(Arc::new(EmptySubscription));
        subscriber.on_error(error);
    }
}

const NO_REQUEST: u8 = 0;
const HAS_REQUEST: u8 = 1;
const CANCELLED: u8 = 2;

/// Subscription of a source emitting exactly one already-known value.
///
/// The value is held until the first valid request, then delivered and
/// followed by completion. Cancellation before the request drops the value.
pub struct ScalarSubscription<T> {
    actual: Arc<dyn Subscriber<T>>,
    value: Mutex<Option<T>>,
    state: AtomicU8,
}

impl<T: Send + 'static> ScalarSubscription<T> {
    #[must_use]
    pub fn new(actual: Arc<dyn Subscriber<T>>, value: T) -> Self {
        Self {
            actual,
            value: Mutex::new(Some(value)),
            state: AtomicU8::new(NO_REQUEST),
        }
    }
}

impl<T: Send + 'static> Subscription for ScalarSubscription<T> {
    fn request(&self, n: u64) {
        if !validate_demand(n) {
            return;
        }
        if self
            .state
            .compare_exchange(NO_REQUEST, HAS_REQUEST, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if let Some(value) = self.value.lock().take() {
                self.actual.on_next(value);
            }
            if self.state.load(Ordering::Acquire) != CANCELLED {
                self.actual.on_complete();
            }
        }
    }

    fn cancel(&self) {
        self.state.store(CANCELLED, Ordering::Release);
        self.value.lock().take();
    }
}
