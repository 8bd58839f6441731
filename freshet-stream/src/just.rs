// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Single-value source.

use freshet_core::{Publisher, ScalarSubscription, Subscriber};
use std::sync::Arc;

/// Emit one value, then complete.
///
/// `just` participates in scalar short-circuiting: fan-in operators consume
/// it through [`Publisher::as_scalar`] without an inner subscription.
#[must_use]
pub fn just<T: Clone>(value: T) -> Just<T> {
    Just { value }
}

/// See [`just`].
pub struct Just<T> {
    value: T,
}

impl<T> Publisher<T> for Just<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let subscription = Arc::new(ScalarSubscription::new(
            Arc::clone(&subscriber),
            self.value.clone(),
        ));
        subscriber.on_subscribe(subscription);
    }

    fn as_scalar(&self) -> Option<T> {
        Some(self.value.clone())
    }
}
