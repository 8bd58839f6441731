// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Fluent combinators over any [`Publisher`].

use crate::buffer::Buffer;
use crate::distinct_until_changed::DistinctUntilChanged;
use crate::filter::Filter;
use crate::flat_map::FlatMap;
use crate::map::Map;
use crate::observe_on::{ObserveOn, QueueSupplier};
use crate::reduce::Reduce;
use crate::scan::Scan;
use crate::skip::Skip;
use crate::skip_while::SkipWhile;
use crate::take::Take;
use freshet_core::{Publisher, Scheduler, Subscriber};
use std::sync::Arc;

/// Chainable operator constructors.
///
/// Implemented for every publisher; each method wraps `self` in the
/// corresponding operator publisher. Subscription still happens through
/// [`Publisher::subscribe`].
///
/// ```
/// use freshet_stream::prelude::*;
///
/// let evens = range(1, 10).filter(|x| x % 2 == 0).take(3);
/// ```
pub trait PublisherExt<T: Send + 'static>: Publisher<T> + Sized + Send + Sync + 'static {
    /// Transform every value with `mapper`.
    fn map<R, F>(self, mapper: F) -> Map<T, Self, F>
    where
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + Clone + 'static,
    {
        Map::new(self, mapper)
    }

    /// Keep only the values matching `predicate`.
    fn filter<F>(self, predicate: F) -> Filter<Self, F>
    where
        F: Fn(&T) -> bool + Send + Sync + Clone + 'static,
    {
        Filter::new(self, predicate)
    }

    /// Relay the first `n` values, then complete.
    fn take(self, n: u64) -> Take<Self> {
        Take::new(self, n)
    }

    /// Drop the first `n` values.
    fn skip(self, n: u64) -> Skip<Self> {
        Skip::new(self, n)
    }

    /// Drop values while `predicate` holds, then relay everything.
    fn skip_while<F>(self, predicate: F) -> SkipWhile<Self, F>
    where
        F: Fn(&T) -> bool + Send + Sync + Clone + 'static,
    {
        SkipWhile::new(self, predicate)
    }

    /// Emit the running accumulation of `accumulator`, starting from (and
    /// including) `initial`.
    fn scan<R, F>(self, initial: R, accumulator: F) -> Scan<T, R, Self, F>
    where
        R: Clone + Send + Sync + 'static,
        F: Fn(R, T) -> R + Send + Sync + Clone + 'static,
    {
        Scan::new(self, initial, accumulator)
    }

    /// Fold the whole stream into one value emitted on completion.
    fn reduce<R, F>(self, initial: R, accumulator: F) -> Reduce<T, R, Self, F>
    where
        R: Clone + Send + Sync + 'static,
        F: Fn(R, T) -> R + Send + Sync + Clone + 'static,
    {
        Reduce::new(self, initial, accumulator)
    }

    /// Suppress consecutive values mapping to the same key.
    fn distinct_until_changed<K, F>(self, key_extractor: F) -> DistinctUntilChanged<Self, F>
    where
        K: PartialEq + Send + 'static,
        F: Fn(&T) -> K + Send + Sync + Clone + 'static,
    {
        DistinctUntilChanged::new(self, key_extractor)
    }

    /// Group values into back-to-back buffers of `size` elements.
    fn buffer(self, size: usize) -> Buffer<Self, fn() -> Vec<T>> {
        Buffer::new(self, size, size, Vec::new)
    }

    /// Group values into buffers of `size` elements, starting a new buffer
    /// every `skip` elements (see [`crate::buffer`] for the strategies).
    fn buffer_with<S>(self, size: usize, skip: usize, supplier: S) -> Buffer<Self, S>
    where
        S: Fn() -> Vec<T> + Send + Sync + Clone + 'static,
    {
        Buffer::new(self, size, skip, supplier)
    }

    /// Deliver downstream signals on `scheduler` with the default prefetch.
    fn observe_on(self, scheduler: Arc<dyn Scheduler>) -> ObserveOn<T, Self> {
        ObserveOn::new(self, scheduler)
    }

    /// [`observe_on`](PublisherExt::observe_on) with explicit prefetch,
    /// error-delay mode and queue supplier.
    fn observe_on_with(
        self,
        scheduler: Arc<dyn Scheduler>,
        prefetch: usize,
        delay_error: bool,
        queue_supplier: QueueSupplier<T>,
    ) -> ObserveOn<T, Self> {
        ObserveOn::with(self, scheduler, prefetch, delay_error, queue_supplier)
    }

    /// Map every value to a publisher and merge the results, with the
    /// default concurrency and prefetch.
    fn flat_map<R, F>(self, mapper: F) -> FlatMap<T, Self, F>
    where
        R: Send + 'static,
        F: Fn(T) -> Arc<dyn Publisher<R>> + Send + Sync + Clone + 'static,
    {
        FlatMap::new(
            self,
            mapper,
            crate::DEFAULT_FAN_IN_PREFETCH,
            crate::DEFAULT_FAN_IN_PREFETCH,
            false,
        )
    }

    /// [`flat_map`](PublisherExt::flat_map) with explicit concurrency cap,
    /// inner prefetch and error-delay mode.
    fn flat_map_with<R, F>(
        self,
        mapper: F,
        max_concurrency: usize,
        prefetch: usize,
        delay_errors: bool,
    ) -> FlatMap<T, Self, F>
    where
        R: Send + 'static,
        F: Fn(T) -> Arc<dyn Publisher<R>> + Send + Sync + Clone + 'static,
    {
        FlatMap::new(self, mapper, max_concurrency, prefetch, delay_errors)
    }

    /// Erase the concrete publisher type.
    fn into_dyn(self) -> Arc<dyn Publisher<T>> {
        Arc::new(self)
    }

    /// Subscribe a trait-object subscriber; mirror of
    /// [`Publisher::subscribe`] that consumes the chain.
    fn subscribe_with(self, subscriber: Arc<dyn Subscriber<T>>) {
        self.subscribe(subscriber);
    }
}

impl<T, P> PublisherExt<T> for P
where
    T: Send + 'static,
    P: Publisher<T> + Send + Sync + Sized + 'static,
{
}
