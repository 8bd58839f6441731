// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Scheduler implementations for the freshet reactive-streams library.
//!
//! [`SingleThreadScheduler`] owns one dedicated worker thread with a FIFO
//! task queue and a deadline heap; [`ExecutorScheduler`] adapts any
//! user-supplied execute function. Both hand out idempotent cancel handles
//! and refuse work after shutdown, which operators surface as a
//! rejected-execution stream error.

pub mod executor;
pub mod single_thread;

pub use executor::ExecutorScheduler;
pub use single_thread::SingleThreadScheduler;
