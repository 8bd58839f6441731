// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use freshet_core::{add_cap, add_demand, multiply_cap, produced, UNBOUNDED};
use std::sync::atomic::AtomicU64;

#[test]
fn test_add_cap_within_range() {
    assert_eq!(add_cap(0, 0), 0);
    assert_eq!(add_cap(1, 2), 3);
    assert_eq!(add_cap(UNBOUNDED - 1, 1), UNBOUNDED);
}

#[test]
fn test_add_cap_saturates_at_unbounded() {
    assert_eq!(add_cap(UNBOUNDED, 1), UNBOUNDED);
    assert_eq!(add_cap(UNBOUNDED, UNBOUNDED), UNBOUNDED);
    assert_eq!(add_cap(UNBOUNDED - 1, 2), UNBOUNDED);
    assert_eq!(add_cap(u64::MAX / 2, u64::MAX / 2), UNBOUNDED);
}

#[test]
fn test_multiply_cap() {
    assert_eq!(multiply_cap(3, 4), 12);
    assert_eq!(multiply_cap(0, UNBOUNDED), 0);
    assert_eq!(multiply_cap(UNBOUNDED, 2), UNBOUNDED);
    assert_eq!(multiply_cap(1 << 32, 1 << 32), UNBOUNDED);
}

#[test]
fn test_add_demand_returns_pre_image() {
    let requested = AtomicU64::new(0);
    assert_eq!(add_demand(&requested, 5), 0);
    assert_eq!(add_demand(&requested, 3), 5);
    assert_eq!(requested.load(std::sync::atomic::Ordering::SeqCst), 8);
}

#[test]
fn test_add_demand_sticks_at_unbounded() {
    let requested = AtomicU64::new(0);
    add_demand(&requested, UNBOUNDED);
    assert_eq!(add_demand(&requested, 10), UNBOUNDED);
    assert_eq!(requested.load(std::sync::atomic::Ordering::SeqCst), UNBOUNDED);
}

#[test]
fn test_produced_deducts() {
    let requested = AtomicU64::new(10);
    assert_eq!(produced(&requested, 4), 6);
    assert_eq!(produced(&requested, 6), 0);
}

#[test]
fn test_produced_ignores_unbounded() {
    let requested = AtomicU64::new(UNBOUNDED);
    assert_eq!(produced(&requested, 100), UNBOUNDED);
    assert_eq!(requested.load(std::sync::atomic::Ordering::SeqCst), UNBOUNDED);
}

#[test]
fn test_produced_saturates_at_zero() {
    let requested = AtomicU64::new(3);
    assert_eq!(produced(&requested, 5), 0);
}

#[test]
fn test_concurrent_add_demand_accumulates() {
    let requested = AtomicU64::new(0);
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..1_000 {
                    add_demand(&requested, 1);
                }
            });
        }
    });
    assert_eq!(requested.load(std::sync::atomic::Ordering::SeqCst), 4_000);
}
