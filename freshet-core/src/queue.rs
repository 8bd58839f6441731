// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Bounded single-producer single-consumer hand-off queue.
//!
//! Async-boundary operators move values between the producing side and the
//! drain with this queue. Capacity is rounded up to a power of two so the
//! ring index is a mask. Offering never blocks: a full queue returns
//! `false`, which the caller turns into an overflow error.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bounded lock-free SPSC array queue.
///
/// The protocol guarantees at most one producer (upstream signals are
/// serial) and at most one consumer (the drain owner) at any time; the
/// queue relies on that contract for safety.
pub struct SpscArrayQueue<T> {
    mask: usize,
    slots: Box<[UnsafeCell<Option<T>>]>,
    /// Consumer index; only advanced by `poll`.
    head: AtomicUsize,
    /// Producer index; only advanced by `offer`.
    tail: AtomicUsize,
}

// Safety: slots are only written by the single producer and taken by the
// single consumer, with head/tail release-acquire pairs ordering the
// accesses.
unsafe impl<T: Send> Send for SpscArrayQueue<T> {}
unsafe impl<T: Send> Sync for SpscArrayQueue<T> {}

impl<T> SpscArrayQueue<T> {
    /// Create a queue holding at least `capacity` elements.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1).next_power_of_two();
        let slots = (0..cap)
            .map(|_| UnsafeCell::new(None))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            mask: cap - 1,
            slots,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Enqueue `value`; returns `false` if the queue is full.
    pub fn offer(&self, value: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) > self.mask {
            return false;
        }
        unsafe {
            *self.slots[tail & self.mask].get() = Some(value);
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Dequeue the next value, if any. Never blocks.
    pub fn poll(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let value = unsafe { (*self.slots[head & self.mask].get()).take() };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        value
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }

    /// Rounded-up capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Drop all queued values, releasing their references.
    ///
    /// Must be called from the consumer side.
    pub fn clear(&self) {
        while self.poll().is_some() {}
    }
}
