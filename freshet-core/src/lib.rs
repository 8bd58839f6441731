// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Core contract of the freshet reactive-streams library.
//!
//! This crate defines the four-signal subscription protocol
//! ([`Subscriber`]/[`Subscription`]/[`Publisher`]), the saturating
//! backpressure arithmetic every operator accounts demand with, the
//! serialization primitives shared by concurrent operators (the
//! post-complete drain, the subscription arbiter, the SPSC hand-off queue)
//! and the scheduler abstraction async-boundary operators hand work to.
//!
//! Operator implementations live in `freshet-stream`; scheduler
//! implementations live in `freshet-runtime`.

#[macro_use]
pub mod logging;

pub mod arbiter;
pub mod backpressure;
pub mod drain;
pub mod error;
pub mod hooks;
pub mod queue;
pub mod scheduler;
pub mod subscriber;
pub mod subscriptions;

pub use arbiter::SubscriptionArbiter;
pub use backpressure::{add_cap, add_demand, multiply_cap, produced, UNBOUNDED};
pub use error::{FreshetError, Result};
pub use queue::SpscArrayQueue;
pub use scheduler::{
    CancelFlag, CancelHandle, Scheduler, SchedulerRejected, Task, TaskSlot, TimeScheduler,
};
pub use subscriber::{Processor, Publisher, Subscriber, Subscription};
pub use subscriptions::{
    validate_demand, EmptySubscription, ScalarSubscription, SubscriptionSlot,
};
