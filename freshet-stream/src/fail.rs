// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Source failing immediately.

use freshet_core::{EmptySubscription, FreshetError, Publisher, Subscriber};
use std::marker::PhantomData;
use std::sync::Arc;

/// Signal `error` immediately without emitting anything.
#[must_use]
pub fn fail<T>(error: FreshetError) -> Fail<T> {
    Fail {
        error,
        _marker: PhantomData,
    }
}

/// See [`fail`].
pub struct Fail<T> {
    error: FreshetError,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Publisher<T> for Fail<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        EmptySubscription::error(&*subscriber, self.error.clone());
    }
}
