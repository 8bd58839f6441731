// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Test utilities for freshet pipelines.
//!
//! [`TestSubscriber`] records every signal a publisher delivers and offers
//! assertion and await helpers; [`ManualScheduler`] executes scheduled work
//! only when the test says so, with a virtual clock for delayed and
//! periodic tasks.

pub mod manual_scheduler;
pub mod test_subscriber;

pub use manual_scheduler::ManualScheduler;
pub use test_subscriber::TestSubscriber;
