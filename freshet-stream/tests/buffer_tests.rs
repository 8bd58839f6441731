// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use freshet_core::FreshetError;
use freshet_stream::prelude::*;
use freshet_test_utils::TestSubscriber;

#[test]
fn test_exact_buffers_with_trailing_partial() {
    // Arrange
    let subscriber = TestSubscriber::unbounded();

    // Act
    range(1, 10).buffer(3).subscribe(subscriber.clone());

    // Assert
    subscriber.assert_values(&[
        vec![1, 2, 3],
        vec![4, 5, 6],
        vec![7, 8, 9],
        vec![10],
    ]);
    subscriber.assert_complete();
}

#[test]
fn test_exact_buffer_demand_is_multiplied_upstream() {
    let subscriber = TestSubscriber::with_request(2);
    range(1, 100).buffer(3).subscribe(subscriber.clone());
    subscriber.assert_values(&[vec![1, 2, 3], vec![4, 5, 6]]);
    subscriber.assert_not_complete();
}

#[test]
fn test_skipping_buffer_drops_the_gap() {
    let subscriber = TestSubscriber::unbounded();
    range(1, 10)
        .buffer_with(2, 3, Vec::new)
        .subscribe(subscriber.clone());
    // windows start at 1, 4, 7, 10; element 3, 6, 9 fall into the gaps
    subscriber.assert_values(&[vec![1, 2], vec![4, 5], vec![7, 8], vec![10]]);
    subscriber.assert_complete();
}

#[test]
fn test_overlapping_buffers() {
    let subscriber = TestSubscriber::unbounded();
    range(1, 5)
        .buffer_with(3, 1, Vec::new)
        .subscribe(subscriber.clone());
    subscriber.assert_values(&[
        vec![1, 2, 3],
        vec![2, 3, 4],
        vec![3, 4, 5],
        vec![4, 5],
        vec![5],
    ]);
    subscriber.assert_complete();
}

#[test]
fn test_overlapping_buffers_replay_after_completion() {
    // Arrange: demand for the two full buffers only
    let subscriber = TestSubscriber::with_request(2);

    // Act
    range(1, 4)
        .buffer_with(3, 1, Vec::new)
        .subscribe(subscriber.clone());

    // Assert: the source is done, the partial windows are parked
    subscriber.assert_values(&[vec![1, 2, 3], vec![2, 3, 4]]);
    subscriber.assert_not_complete();

    subscriber.request(1);
    subscriber.assert_values(&[vec![1, 2, 3], vec![2, 3, 4], vec![3, 4]]);
    subscriber.assert_not_complete();

    subscriber.request(10);
    subscriber.assert_values(&[
        vec![1, 2, 3],
        vec![2, 3, 4],
        vec![3, 4],
        vec![4],
    ]);
    subscriber.assert_complete();
}

#[test]
fn test_buffer_error_discards_collected_items() {
    let subscriber = TestSubscriber::<Vec<i64>>::unbounded();
    let failing: std::sync::Arc<dyn Publisher<i64>> =
        std::sync::Arc::new(fail::<i64>(FreshetError::stream("source broke")));
    let source = concat_array(vec![range(1, 2).into_dyn(), failing]);

    source.buffer(5).subscribe(subscriber.clone());

    subscriber.assert_values(&[]);
    subscriber.assert_error_count(1);
    subscriber.assert_not_complete();
}

#[test]
#[should_panic(expected = "buffer size must be at least 1")]
fn test_buffer_zero_size_panics() {
    let _ = range(1, 3).buffer(0);
}
