// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Static fan-in over a fixed set of sources.
//!
//! `merge` is the degenerate form of [`flat_map`](crate::flat_map): the
//! source registry is fixed at subscription time and the mapper is the
//! identity, so the drain, inner queues and error accumulation are shared
//! with the dynamic fan-in. Per-source ordering is preserved; no order is
//! guaranteed across sources.

use crate::flat_map::FlatMap;
use crate::from_iter::from_iter;
use freshet_core::{EmptySubscription, Publisher, Subscriber};
use std::sync::Arc;

/// Merge the given sources into one stream.
#[must_use]
pub fn merge<T>(sources: Vec<Arc<dyn Publisher<T>>>) -> Merge<T> {
    Merge {
        sources,
        delay_errors: false,
    }
}

/// Merge the given sources, delaying errors until all sources finished.
#[must_use]
pub fn merge_delay_errors<T>(sources: Vec<Arc<dyn Publisher<T>>>) -> Merge<T> {
    Merge {
        sources,
        delay_errors: true,
    }
}

/// See [`merge`].
pub struct Merge<T> {
    sources: Vec<Arc<dyn Publisher<T>>>,
    delay_errors: bool,
}

impl<T> Publisher<T> for Merge<T>
where
    T: Send + 'static,
{
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        if self.sources.is_empty() {
            EmptySubscription::complete(&*subscriber);
            return;
        }
        let assembled = FlatMap::new(
            from_iter(self.sources.clone()),
            |source: Arc<dyn Publisher<T>>| source,
            self.sources.len(),
            crate::DEFAULT_FAN_IN_PREFETCH,
            self.delay_errors,
        );
        assembled.subscribe(subscriber);
    }
}
