// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The four-signal subscription protocol.
//!
//! # Overview
//!
//! A [`Publisher`] produces values for a [`Subscriber`] under a strict
//! demand-driven contract:
//!
//! 1. `subscribe` hands the publisher a subscriber; the publisher responds
//!    with exactly one `on_subscribe` carrying a [`Subscription`] handle.
//! 2. The subscriber signals readiness with `request(n)`; the publisher may
//!    then emit up to `n` `on_next` signals.
//! 3. The stream ends with at most one terminal signal, `on_error` or
//!    `on_complete`, after which nothing else is delivered.
//! 4. `cancel` releases the subscription; it is idempotent and eventually
//!    cancels the upstream exactly once.
//!
//! All four downstream signals are **serially observed**: operators that are
//! entered by several threads serialize their emission section (see the
//! work-in-progress drain idiom used throughout `freshet-stream`), so a
//! subscriber never sees overlapping calls.
//!
//! # Basic Usage
//!
//! ```
//! use std::sync::Arc;
//! use freshet_core::{FreshetError, Subscriber, Subscription, UNBOUNDED};
//!
//! struct Printer;
//!
//! impl Subscriber<i64> for Printer {
//!     fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
//!         subscription.request(UNBOUNDED);
//!     }
//!     fn on_next(&self, value: i64) {
//!         println!("{value}");
//!     }
//!     fn on_error(&self, error: FreshetError) {
//!         eprintln!("failed: {error}");
//!     }
//!     fn on_complete(&self) {}
//! }
//! ```

use crate::error::FreshetError;
use std::sync::Arc;

/// Handle linking one subscriber to one upstream.
///
/// Both operations may be called from any thread, any number of times.
pub trait Subscription: Send + Sync {
    /// Add `n` to the outstanding demand of this subscription.
    ///
    /// `n` must be positive; a zero request is a protocol violation reported
    /// to the process-wide sink. Demand accumulates with saturating
    /// arithmetic and [`crate::UNBOUNDED`] disables accounting entirely.
    fn request(&self, n: u64);

    /// Release the subscription.
    ///
    /// Idempotent. Values already in flight may still be delivered, but no
    /// new emission begins after cancellation is observed.
    fn cancel(&self);
}

/// Receiver of the four downstream signals.
pub trait Subscriber<T>: Send + Sync {
    /// Exactly one per subscription, before any other signal.
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    /// One value; never delivered beyond the requested demand.
    fn on_next(&self, value: T);

    /// Terminal failure; nothing follows.
    fn on_error(&self, error: FreshetError);

    /// Terminal completion; nothing follows.
    fn on_complete(&self);
}

/// Source of a signal stream.
pub trait Publisher<T>: Send + Sync {
    /// Attach `subscriber` to this publisher.
    ///
    /// The publisher calls `on_subscribe` exactly once before any other
    /// signal, possibly synchronously.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>);

    /// Scalar short-circuit hook.
    ///
    /// A publisher known to emit at most one constant value can reveal it
    /// here so fan-in operators consume it without a queue or an inner
    /// subscription. The default reveals nothing.
    fn as_scalar(&self) -> Option<T> {
        None
    }
}

/// A stage that is both a subscriber and a publisher.
pub trait Processor<T>: Subscriber<T> + Publisher<T> {}

impl<T, P> Processor<T> for P where P: Subscriber<T> + Publisher<T> {}

impl<T, P> Publisher<T> for Arc<P>
where
    P: Publisher<T> + ?Sized,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        (**self).subscribe(subscriber);
    }

    fn as_scalar(&self) -> Option<T> {
        (**self).as_scalar()
    }
}
