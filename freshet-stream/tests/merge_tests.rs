// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use freshet_core::FreshetError;
use freshet_stream::prelude::*;
use freshet_test_utils::TestSubscriber;

#[test]
fn test_merge_emits_everything() {
    // Arrange
    let subscriber = TestSubscriber::unbounded();

    // Act
    merge(vec![range(1, 3).into_dyn(), range(10, 2).into_dyn()])
        .subscribe(subscriber.clone());

    // Assert: no cross-source order guarantee, so compare sorted
    let mut values = subscriber.values();
    values.sort_unstable();
    assert_eq!(values, vec![1, 2, 3, 10, 11]);
    subscriber.assert_complete();
}

#[test]
fn test_merge_preserves_per_source_order() {
    let subscriber = TestSubscriber::unbounded();
    merge(vec![range(0, 3).into_dyn(), range(100, 3).into_dyn()])
        .subscribe(subscriber.clone());

    let values = subscriber.values();
    let low: Vec<i64> = values.iter().copied().filter(|v| *v < 100).collect();
    let high: Vec<i64> = values.iter().copied().filter(|v| *v >= 100).collect();
    assert_eq!(low, vec![0, 1, 2]);
    assert_eq!(high, vec![100, 101, 102]);
    subscriber.assert_complete();
}

#[test]
fn test_merge_of_nothing_completes() {
    let subscriber = TestSubscriber::<i32>::with_request(0);
    merge(Vec::new()).subscribe(subscriber.clone());
    subscriber.assert_complete();
}

#[test]
fn test_merge_honors_downstream_demand() {
    let subscriber = TestSubscriber::with_request(2);
    merge(vec![range(1, 5).into_dyn(), range(10, 5).into_dyn()])
        .subscribe(subscriber.clone());
    subscriber.assert_value_count(2);
    subscriber.assert_not_complete();

    subscriber.request(100);
    let mut values = subscriber.values();
    values.sort_unstable();
    assert_eq!(values, vec![1, 2, 3, 4, 5, 10, 11, 12, 13, 14]);
    subscriber.assert_complete();
}

#[test]
fn test_merge_error_terminates() {
    let subscriber = TestSubscriber::unbounded();
    merge(vec![
        range(1, 2).into_dyn(),
        fail::<i64>(FreshetError::stream("merge source died")).into_dyn(),
    ])
    .subscribe(subscriber.clone());

    subscriber.assert_error_count(1);
    subscriber.assert_not_complete();
}

#[test]
fn test_merge_delay_errors_drains_live_sources_first() {
    let subscriber = TestSubscriber::unbounded();
    merge_delay_errors(vec![
        fail::<i64>(FreshetError::stream("dead source")).into_dyn(),
        range(7, 3).into_dyn(),
    ])
    .subscribe(subscriber.clone());

    subscriber.assert_values(&[7, 8, 9]);
    subscriber.assert_error(|error| !error.is_composite());
    subscriber.assert_not_complete();
}
