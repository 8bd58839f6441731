// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Saturating demand arithmetic.
//!
//! Outstanding demand is a 64-bit budget clamped at [`UNBOUNDED`], the
//! largest positive signed value. Keeping the top bit free lets operators
//! that need it share the same field with a completion flag (see
//! [`crate::drain`]). Once a demand counter reaches [`UNBOUNDED`] it stays
//! there: emission no longer decrements it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sentinel demand meaning "no backpressure": the maximum positive count.
pub const UNBOUNDED: u64 = i64::MAX as u64;

/// Add two demand amounts, clamping at [`UNBOUNDED`].
#[must_use]
pub const fn add_cap(a: u64, b: u64) -> u64 {
    let sum = a.saturating_add(b);
    if sum > UNBOUNDED {
        UNBOUNDED
    } else {
        sum
    }
}

/// Multiply two demand amounts, clamping at [`UNBOUNDED`].
#[must_use]
pub const fn multiply_cap(a: u64, b: u64) -> u64 {
    let product = a.saturating_mul(b);
    if product > UNBOUNDED {
        UNBOUNDED
    } else {
        product
    }
}

/// Atomically add `n` to an outstanding-demand field, clamping at
/// [`UNBOUNDED`], and return the pre-image.
///
/// A field already at [`UNBOUNDED`] is left untouched.
pub fn add_demand(requested: &AtomicU64, n: u64) -> u64 {
    let mut current = requested.load(Ordering::Acquire);
    loop {
        if current == UNBOUNDED {
            return UNBOUNDED;
        }
        let next = add_cap(current, n);
        match requested.compare_exchange_weak(
            current,
            next,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => return current,
            Err(observed) => current = observed,
        }
    }
}

/// Atomically deduct `n` emitted values from an outstanding-demand field and
/// return the new value.
///
/// A field at [`UNBOUNDED`] is left untouched; the deduction saturates at
/// zero rather than wrapping.
pub fn produced(requested: &AtomicU64, n: u64) -> u64 {
    let mut current = requested.load(Ordering::Acquire);
    loop {
        if current == UNBOUNDED {
            return UNBOUNDED;
        }
        let next = current.saturating_sub(n);
        match requested.compare_exchange_weak(
            current,
            next,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => return next,
            Err(observed) => current = observed,
        }
    }
}
