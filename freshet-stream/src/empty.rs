// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Source completing immediately without values.

use freshet_core::{EmptySubscription, Publisher, Subscriber};
use std::marker::PhantomData;
use std::sync::Arc;

/// Complete immediately without emitting anything.
#[must_use]
pub fn empty<T>() -> Empty<T> {
    Empty {
        _marker: PhantomData,
    }
}

/// See [`empty`].
pub struct Empty<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Publisher<T> for Empty<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        EmptySubscription::complete(&*subscriber);
    }
}
