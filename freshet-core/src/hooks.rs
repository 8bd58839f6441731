// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Process-wide sink for signals that can no longer reach a subscriber.
//!
//! The subscription protocol forbids delivering anything after a terminal
//! signal, so errors raised past that point (double errors, errors after
//! cancel, protocol violations) are routed here instead of being lost.
//! By default they are logged; installing a hook redirects them, which the
//! test suites use to observe violations.

use crate::error::FreshetError;
use parking_lot::RwLock;

type ErrorHook = Box<dyn Fn(&FreshetError) + Send + Sync>;
type NextDroppedHook = Box<dyn Fn() + Send + Sync>;

static ERROR_DROPPED_HOOK: RwLock<Option<ErrorHook>> = RwLock::new(None);
static NEXT_DROPPED_HOOK: RwLock<Option<NextDroppedHook>> = RwLock::new(None);

/// Deliver an error that cannot be signalled to any subscriber.
pub fn on_error_dropped(error: &FreshetError) {
    let hook = ERROR_DROPPED_HOOK.read();
    match &*hook {
        Some(hook) => hook(error),
        None => crate::error!("freshet: dropped error signal: {error}"),
    }
}

/// Record a value that arrived after a terminal signal and was discarded.
///
/// The value itself is dropped here; only the fact that it was dropped is
/// observable.
pub fn on_next_dropped<T>(value: T) {
    drop(value);
    let hook = NEXT_DROPPED_HOOK.read();
    match &*hook {
        Some(hook) => hook(),
        None => crate::warn!("freshet: dropped value delivered after termination"),
    }
}

/// Install a process-wide hook receiving dropped errors.
pub fn set_error_dropped_hook(hook: impl Fn(&FreshetError) + Send + Sync + 'static) {
    *ERROR_DROPPED_HOOK.write() = Some(Box::new(hook));
}

/// Restore the default (logging) behavior for dropped errors.
pub fn reset_error_dropped_hook() {
    *ERROR_DROPPED_HOOK.write() = None;
}

/// Install a process-wide hook fired whenever a value is dropped.
pub fn set_next_dropped_hook(hook: impl Fn() + Send + Sync + 'static) {
    *NEXT_DROPPED_HOOK.write() = Some(Box::new(hook));
}

/// Restore the default (logging) behavior for dropped values.
pub fn reset_next_dropped_hook() {
    *NEXT_DROPPED_HOOK.write() = None;
}
