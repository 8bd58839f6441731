// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use freshet_core::FreshetError;
use freshet_stream::prelude::*;
use freshet_test_utils::TestSubscriber;

#[test]
fn test_zip_combines_rows_by_index() {
    // Arrange
    let subscriber = TestSubscriber::unbounded();

    // Act
    zip(
        vec![range(1, 3).into_dyn(), range(10, 3).into_dyn()],
        |row: Vec<i64>| (row[0], row[1]),
    )
    .subscribe(subscriber.clone());

    // Assert: field order follows source declaration order
    subscriber.assert_values(&[(1, 10), (2, 11), (3, 12)]);
    subscriber.assert_complete();
}

#[test]
fn test_zip_completes_on_shortest_source() {
    let subscriber = TestSubscriber::unbounded();
    zip(
        vec![range(1, 2).into_dyn(), range(10, 5).into_dyn()],
        |row: Vec<i64>| row[0] + row[1],
    )
    .subscribe(subscriber.clone());

    subscriber.assert_values(&[11, 13]);
    subscriber.assert_complete();
}

#[test]
fn test_zip_honors_downstream_demand() {
    let subscriber = TestSubscriber::with_request(1);
    zip(
        vec![range(1, 4).into_dyn(), range(10, 4).into_dyn()],
        |row: Vec<i64>| row[0] + row[1],
    )
    .subscribe(subscriber.clone());

    subscriber.assert_values(&[11]);
    subscriber.assert_not_complete();

    subscriber.request(10);
    subscriber.assert_values(&[11, 13, 15, 17]);
    subscriber.assert_complete();
}

#[test]
fn test_zip_of_nothing_completes() {
    let subscriber = TestSubscriber::<i64>::with_request(0);
    zip(Vec::new(), |row: Vec<i64>| row[0]).subscribe(subscriber.clone());
    subscriber.assert_complete();
}

#[test]
fn test_zip_with_empty_source_completes_without_rows() {
    let subscriber = TestSubscriber::unbounded();
    zip(
        vec![range(1, 3).into_dyn(), empty::<i64>().into_dyn()],
        |row: Vec<i64>| row[0],
    )
    .subscribe(subscriber.clone());

    subscriber.assert_values(&[]);
    subscriber.assert_complete();
}

#[test]
fn test_zip_error_cancels_all_sources() {
    let subscriber = TestSubscriber::unbounded();
    zip(
        vec![
            range(1, 3).into_dyn(),
            fail::<i64>(FreshetError::stream("zip source died")).into_dyn(),
        ],
        |row: Vec<i64>| row[0],
    )
    .subscribe(subscriber.clone());

    subscriber.assert_values(&[]);
    subscriber.assert_error_count(1);
    subscriber.assert_not_complete();
}

#[test]
fn test_zip_replenishes_small_prefetch() {
    // A prefetch smaller than the stream forces mid-stream re-requests
    let subscriber = TestSubscriber::unbounded();
    zip_with_prefetch(
        vec![range(0, 100).into_dyn(), range(1000, 100).into_dyn()],
        4,
        |row: Vec<i64>| row[1] - row[0],
    )
    .subscribe(subscriber.clone());

    subscriber.assert_value_count(100);
    assert!(subscriber.values().iter().all(|delta| *delta == 1000));
    subscriber.assert_complete();
}

#[test]
fn test_zip_three_sources() {
    let subscriber = TestSubscriber::unbounded();
    zip(
        vec![
            range(0, 2).into_dyn(),
            range(10, 2).into_dyn(),
            range(20, 2).into_dyn(),
        ],
        |row: Vec<i64>| row.iter().sum::<i64>(),
    )
    .subscribe(subscriber.clone());

    subscriber.assert_values(&[30, 33]);
    subscriber.assert_complete();
}
