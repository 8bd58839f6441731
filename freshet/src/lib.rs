// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Composable reactive-streams operators with demand-driven backpressure.
//!
//! # Overview
//!
//! freshet connects producers to consumers under a strict
//! pull-with-bounded-push contract: a subscriber signals how many values it
//! is prepared to receive, operators account that demand with saturating
//! arithmetic, and every stage observes the four-signal subscription
//! protocol (`on_subscribe`, `on_next*`, then at most one terminal).
//!
//! The workspace splits into:
//!
//! - [`freshet_core`]: the signal contract, backpressure and drain
//!   primitives;
//! - [`freshet_stream`]: sources, operators and the multicast processor;
//! - [`freshet_runtime`]: scheduler implementations.
//!
//! This crate re-exports all of it.
//!
//! # Basic Usage
//!
//! ```
//! use freshet::prelude::*;
//! use freshet_test_utils::TestSubscriber;
//!
//! let subscriber = TestSubscriber::unbounded();
//! range(1, 5).map(|x| x * 10).subscribe(subscriber.clone());
//!
//! subscriber.assert_values(&[10, 20, 30, 40, 50]);
//! subscriber.assert_complete();
//! ```

pub use freshet_core::{
    add_cap, add_demand, hooks, multiply_cap, produced, CancelHandle, FreshetError, Processor,
    Publisher, Result, Scheduler, SchedulerRejected, SpscArrayQueue, Subscriber, Subscription,
    SubscriptionArbiter, TaskSlot, TimeScheduler, UNBOUNDED,
};
pub use freshet_runtime::{ExecutorScheduler, SingleThreadScheduler};
pub use freshet_stream::{
    concat_array, concat_iter, empty, fail, from_iter, interval, just, merge, merge_delay_errors,
    range, timer, zip, zip_with_prefetch, IntoStreamExt, MulticastProcessor, PublisherExt,
};

/// Commonly used types and traits.
pub mod prelude {
    pub use freshet_core::{
        FreshetError, Publisher, Result, Scheduler, Subscriber, Subscription, TimeScheduler,
        UNBOUNDED,
    };
    pub use freshet_runtime::{ExecutorScheduler, SingleThreadScheduler};
    pub use freshet_stream::prelude::*;
}
