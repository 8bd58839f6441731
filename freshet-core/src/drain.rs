// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Post-complete drain for buffering operators.
//!
//! # Overview
//!
//! Operators that aggregate upstream values into buffers may see their
//! upstream complete while buffers are still waiting for downstream demand.
//! From that point on, `request` must replay from the buffer queue instead
//! of being forwarded upstream. The state needed for that hand-over lives in
//! a single 64-bit field: the top bit flags "source completed", the low 63
//! bits hold outstanding demand.
//!
//! State transitions:
//!
//! - `(active, r) -> (active, r + n)`: a request before completion; the
//!   caller keeps forwarding upstream.
//! - `(active, r) -> (complete, r)`: upstream completed; if `r` was
//!   non-zero the completing thread drains inline.
//! - `(complete, 0) -> (complete, n)`: a late request; the requesting
//!   thread drives the replay.
//!
//! The drain loop emits up to the demand, deducts the emitted count and
//! re-observes, exiting either on an empty queue (terminal emitted) or on
//! exhausted demand (waiting for the next request).

use crate::backpressure::add_cap;
use crate::subscriber::Subscriber;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Top bit: the source has completed and the queue is in replay mode.
pub const COMPLETED_MASK: u64 = 0x8000_0000_0000_0000;
/// Low 63 bits: outstanding downstream demand.
pub const REQUESTED_MASK: u64 = 0x7FFF_FFFF_FFFF_FFFF;

/// Account a request against a demand-with-completion field.
///
/// Returns `true` if the field was already in the completed state, in which
/// case the caller must NOT forward the request upstream; the replay (if the
/// pre-image demand was zero) has already been driven here.
pub fn post_complete_request<T>(
    n: u64,
    actual: &Arc<dyn Subscriber<T>>,
    queue: &Mutex<VecDeque<T>>,
    state: &AtomicU64,
    cancelled: &AtomicBool,
) -> bool {
    loop {
        let r = state.load(Ordering::Acquire);
        let requested = r & REQUESTED_MASK;
        let next = (r & COMPLETED_MASK) | add_cap(requested, n);

        if state
            .compare_exchange(r, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            // (complete, 0) -> (complete, n): this caller replays
            if r == COMPLETED_MASK {
                post_complete_drain(n | COMPLETED_MASK, actual, queue, state, cancelled);
                return true;
            }
            // (active, r) -> (active, r + n): keep requesting upstream
            return r & COMPLETED_MASK != 0;
        }
    }
}

/// Flip the field into the completed state, draining if demand allows.
///
/// Called exactly once, when the upstream completes. An empty queue
/// completes the downstream immediately.
pub fn post_complete<T>(
    actual: &Arc<dyn Subscriber<T>>,
    queue: &Mutex<VecDeque<T>>,
    state: &AtomicU64,
    cancelled: &AtomicBool,
) {
    if queue.lock().is_empty() {
        actual.on_complete();
        return;
    }

    if post_complete_drain(state.load(Ordering::Acquire), actual, queue, state, cancelled) {
        return;
    }

    loop {
        let r = state.load(Ordering::Acquire);
        if r & COMPLETED_MASK != 0 {
            return;
        }
        let next = r | COMPLETED_MASK;
        // (active, r) -> (complete, r)
        if state
            .compare_exchange(r, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if r != 0 {
                post_complete_drain(next, actual, queue, state, cancelled);
            }
            return;
        }
    }
}

/// Emit queued values up to the observed demand.
///
/// Returns `true` if the queue was fully drained (terminal emitted) or the
/// drain was cancelled; `false` if it stopped on exhausted demand.
fn post_complete_drain<T>(
    mut n: u64,
    actual: &Arc<dyn Subscriber<T>>,
    queue: &Mutex<VecDeque<T>>,
    state: &AtomicU64,
    cancelled: &AtomicBool,
) -> bool {
    // The unbounded-demand fast path is intentionally not taken; callers
    // must not rely on whether a drain went through it.

    let mut emitted = n & COMPLETED_MASK;

    loop {
        while emitted != n {
            if cancelled.load(Ordering::Acquire) {
                return true;
            }

            let value = queue.lock().pop_front();

            match value {
                None => {
                    actual.on_complete();
                    return true;
                }
                Some(value) => {
                    actual.on_next(value);
                    emitted += 1;
                }
            }
        }

        if cancelled.load(Ordering::Acquire) {
            return true;
        }

        if queue.lock().is_empty() {
            actual.on_complete();
            return true;
        }

        n = state.load(Ordering::Acquire);

        if n == emitted {
            let deduct = emitted & REQUESTED_MASK;
            let previous = state.fetch_sub(deduct, Ordering::AcqRel);
            n = previous - deduct;

            if n & REQUESTED_MASK == 0 {
                return false;
            }

            emitted = n & COMPLETED_MASK;
        }
    }
}
