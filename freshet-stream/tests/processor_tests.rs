// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use freshet_core::{FreshetError, Subscriber};
use freshet_stream::prelude::*;
use freshet_test_utils::TestSubscriber;

#[test]
fn test_values_fan_out_to_all_subscribers() {
    // Arrange
    let processor = MulticastProcessor::new();
    let first = TestSubscriber::unbounded();
    let second = TestSubscriber::unbounded();
    processor.subscribe(first.clone());
    processor.subscribe(second.clone());

    // Act
    processor.on_next('a');
    processor.on_next('b');
    processor.on_complete();

    // Assert
    first.assert_values(&['a', 'b']);
    first.assert_complete();
    second.assert_values(&['a', 'b']);
    second.assert_complete();
}

#[test]
fn test_slow_subscriber_is_removed_and_errored_individually() {
    // Arrange: one subscriber with demand for two, one unbounded
    let processor = MulticastProcessor::new();
    let slow = TestSubscriber::with_request(2);
    let fast = TestSubscriber::unbounded();
    processor.subscribe(slow.clone());
    processor.subscribe(fast.clone());

    // Act
    processor.on_next('a');
    processor.on_next('b');
    processor.on_next('c');
    processor.on_complete();

    // Assert: the slow subscriber saw two values then a demand error
    slow.assert_values(&['a', 'b']);
    slow.assert_error(|error| error.is_lack_of_demand());
    slow.assert_not_complete();

    fast.assert_values(&['a', 'b', 'c']);
    fast.assert_complete();
}

#[test]
fn test_late_subscriber_receives_stored_completion() {
    let processor = MulticastProcessor::<i32>::new();
    processor.on_complete();

    let late = TestSubscriber::with_request(0);
    processor.subscribe(late.clone());
    late.assert_complete();
}

#[test]
fn test_late_subscriber_receives_stored_error() {
    let processor = MulticastProcessor::<i32>::new();
    processor.on_error(FreshetError::stream("already failed"));

    let late = TestSubscriber::with_request(0);
    processor.subscribe(late.clone());
    late.assert_error_count(1);
    late.assert_not_complete();
}

#[test]
fn test_cancelled_subscriber_is_detached() {
    let processor = MulticastProcessor::new();
    let subscriber = TestSubscriber::unbounded();
    processor.subscribe(subscriber.clone());
    assert_eq!(processor.subscriber_count(), 1);

    subscriber.cancel();
    assert_eq!(processor.subscriber_count(), 0);

    processor.on_next(1);
    subscriber.assert_values(&[]);
}

#[test]
fn test_terminal_is_dispatched_once() {
    let processor = MulticastProcessor::<i32>::new();
    let subscriber = TestSubscriber::unbounded();
    processor.subscribe(subscriber.clone());

    processor.on_complete();
    processor.on_complete();
    subscriber.assert_complete();
    assert!(processor.is_terminated());
}

#[test]
fn test_values_after_terminal_are_dropped() {
    let processor = MulticastProcessor::new();
    let subscriber = TestSubscriber::unbounded();
    processor.subscribe(subscriber.clone());

    processor.on_next(1);
    processor.on_complete();
    processor.on_next(2);

    subscriber.assert_values(&[1]);
    subscriber.assert_complete();
}

#[test]
fn test_processor_chains_as_a_subscriber() {
    // The processor subscribed to a source relays it to its subscribers
    let processor = MulticastProcessor::new();
    let subscriber = TestSubscriber::unbounded();
    processor.subscribe(subscriber.clone());

    range(1, 4).subscribe(processor.clone());

    subscriber.assert_values(&[1, 2, 3, 4]);
    subscriber.assert_complete();
}
