// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use freshet_core::{FreshetError, Publisher};
use freshet_stream::prelude::*;
use freshet_test_utils::TestSubscriber;
use std::sync::Arc;

#[test]
fn test_flat_map_serialized_inner_order() {
    // Arrange
    let subscriber = TestSubscriber::unbounded();

    // Act: with a concurrency of one the inners run strictly one by one
    range(1, 3)
        .flat_map_with(|x| range(x, 2).into_dyn(), 1, 32, false)
        .subscribe(subscriber.clone());

    // Assert
    subscriber.assert_values(&[1, 2, 2, 3, 3, 4]);
    subscriber.assert_complete();
}

#[test]
fn test_flat_map_with_default_concurrency() {
    let subscriber = TestSubscriber::unbounded();
    range(1, 3)
        .flat_map(|x| range(x * 10, 2).into_dyn())
        .subscribe(subscriber.clone());

    let mut values = subscriber.values();
    values.sort_unstable();
    assert_eq!(values, vec![10, 11, 20, 21, 30, 31]);
    subscriber.assert_complete();
}

#[test]
fn test_flat_map_preserves_per_inner_order() {
    let subscriber = TestSubscriber::unbounded();
    range(0, 3)
        .flat_map(|x| range(x * 100, 3).into_dyn())
        .subscribe(subscriber.clone());

    let values = subscriber.values();
    for base in [0, 100, 200] {
        let inner: Vec<i64> = values.iter().copied().filter(|v| v / 100 == base / 100 && *v >= base).collect();
        assert_eq!(inner, vec![base, base + 1, base + 2]);
    }
    subscriber.assert_complete();
}

#[test]
fn test_flat_map_scalar_short_circuit() {
    let subscriber = TestSubscriber::unbounded();
    range(1, 4)
        .flat_map(|x| just(x * 2).into_dyn())
        .subscribe(subscriber.clone());
    subscriber.assert_values(&[2, 4, 6, 8]);
    subscriber.assert_complete();
}

#[test]
fn test_flat_map_scalars_respect_demand() {
    let subscriber = TestSubscriber::with_request(2);
    range(1, 4)
        .flat_map(|x| just(x).into_dyn())
        .subscribe(subscriber.clone());
    subscriber.assert_values(&[1, 2]);
    subscriber.assert_not_complete();

    subscriber.request(10);
    subscriber.assert_values(&[1, 2, 3, 4]);
    subscriber.assert_complete();
}

#[test]
fn test_flat_map_bounded_demand_on_inners() {
    let subscriber = TestSubscriber::with_request(3);
    range(1, 3)
        .flat_map_with(|x| range(x, 2).into_dyn(), 1, 32, false)
        .subscribe(subscriber.clone());
    subscriber.assert_values(&[1, 2, 2]);
    subscriber.assert_not_complete();

    subscriber.request(10);
    subscriber.assert_values(&[1, 2, 2, 3, 3, 4]);
    subscriber.assert_complete();
}

#[test]
fn test_flat_map_empty_inners_complete() {
    let subscriber = TestSubscriber::unbounded();
    range(1, 3)
        .flat_map(|_| empty::<i64>().into_dyn())
        .subscribe(subscriber.clone());
    subscriber.assert_values(&[]);
    subscriber.assert_complete();
}

#[test]
fn test_flat_map_error_cancels_everything() {
    let subscriber = TestSubscriber::unbounded();
    range(1, 3)
        .flat_map_with(
            |x| {
                if x == 2 {
                    fail::<i64>(FreshetError::stream("inner died")).into_dyn()
                } else {
                    range(x, 2).into_dyn()
                }
            },
            1,
            32,
            false,
        )
        .subscribe(subscriber.clone());

    subscriber.assert_values(&[1, 2]);
    subscriber.assert_error_count(1);
    subscriber.assert_not_complete();
}

#[test]
fn test_flat_map_delay_errors_keeps_other_inners_running() {
    let subscriber = TestSubscriber::unbounded();
    range(1, 3)
        .flat_map_with(
            |x| {
                if x == 2 {
                    fail::<i64>(FreshetError::stream("inner died")).into_dyn()
                } else {
                    range(x * 10, 2).into_dyn()
                }
            },
            1,
            32,
            true,
        )
        .subscribe(subscriber.clone());

    subscriber.assert_values(&[10, 11, 30, 31]);
    subscriber.assert_error(|error| !error.is_composite());
    subscriber.assert_not_complete();
}

#[test]
fn test_flat_map_delay_errors_combines_failures() {
    let subscriber = TestSubscriber::<i64>::unbounded();
    range(1, 2)
        .flat_map_with(
            |_| {
                concat_array(vec![
                    fail::<i64>(FreshetError::stream("a")).into_dyn(),
                ])
                .delay_errors()
                .into_dyn()
            },
            1,
            32,
            true,
        )
        .subscribe(subscriber.clone());
    subscriber.assert_error_count(1);
}

#[test]
fn test_flat_map_cancel_propagates() {
    let subscriber = TestSubscriber::with_request(1);
    range(1, 3)
        .flat_map_with(|x| range(x, 10).into_dyn(), 1, 32, false)
        .subscribe(subscriber.clone());
    subscriber.assert_values(&[1]);

    subscriber.cancel();
    subscriber.request(100);
    subscriber.assert_values(&[1]);
    subscriber.assert_not_complete();
}

#[test]
fn test_flat_map_mixed_scalar_and_stream_inners() {
    let subscriber = TestSubscriber::unbounded();
    range(1, 2)
        .flat_map_with(
            |x| {
                let scalar: Arc<dyn Publisher<i64>> = just(x * 100).into_dyn();
                scalar
            },
            4,
            32,
            false,
        )
        .subscribe(subscriber.clone());
    subscriber.assert_values(&[100]);
    subscriber.assert_complete();
}
