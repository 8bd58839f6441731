// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
//! Sources, operators and the multicast processor of the freshet
//! reactive-streams library.
//!
//! Every operator in this crate is a [`Publisher`](freshet_core::Publisher)
//! that, on subscribe, chains a per-subscription state machine between its
//! downstream and its upstream(s). The fluent entry point is
//! [`PublisherExt`]; multi-source assemblers ([`merge`], [`concat_array`],
//! [`zip`]) are free functions over a source list.
//!
//! ```
//! use freshet_stream::prelude::*;
//!
//! let doubled = range(1, 5).map(|x| x * 2);
//! ```

pub mod buffer;
pub mod concat;
pub mod distinct_until_changed;
pub mod empty;
pub mod ext;
pub mod fail;
pub mod filter;
pub mod flat_map;
pub mod from_iter;
pub mod into_stream;
pub mod just;
pub mod map;
pub mod merge;
pub mod observe_on;
pub mod processor;
pub mod range;
pub mod reduce;
pub mod scan;
pub mod skip;
pub mod skip_while;
pub mod take;
pub mod timer;
pub mod zip;

pub use buffer::Buffer;
pub use concat::{concat_array, concat_iter, ConcatArray};
pub use distinct_until_changed::DistinctUntilChanged;
pub use empty::{empty, Empty};
pub use ext::PublisherExt;
pub use fail::{fail, Fail};
pub use filter::Filter;
pub use flat_map::FlatMap;
pub use from_iter::{from_iter, FromIter};
pub use into_stream::{IntoStreamExt, PublisherStream};
pub use just::{just, Just};
pub use map::Map;
pub use merge::{merge, merge_delay_errors, Merge};
pub use observe_on::ObserveOn;
pub use processor::MulticastProcessor;
pub use range::{range, Range};
pub use reduce::Reduce;
pub use scan::Scan;
pub use skip::Skip;
pub use skip_while::SkipWhile;
pub use take::Take;
pub use timer::{interval, timer, Interval, Timer};
pub use zip::{zip, zip_with_prefetch, Zip};

/// Default prefetch of the async-boundary operators.
pub const DEFAULT_PREFETCH: usize = 256;

/// Default inner prefetch and concurrency cap of [`flat_map`](PublisherExt::flat_map).
pub const DEFAULT_FAN_IN_PREFETCH: usize = 32;

/// Commonly used types and traits.
pub mod prelude {
    pub use crate::concat::{concat_array, concat_iter};
    pub use crate::empty::empty;
    pub use crate::ext::PublisherExt;
    pub use crate::fail::fail;
    pub use crate::from_iter::from_iter;
    pub use crate::into_stream::IntoStreamExt;
    pub use crate::just::just;
    pub use crate::merge::{merge, merge_delay_errors};
    pub use crate::processor::MulticastProcessor;
    pub use crate::range::range;
    pub use crate::timer::{interval, timer};
    pub use crate::zip::{zip, zip_with_prefetch};
    pub use freshet_core::{
        FreshetError, Publisher, Result, Scheduler, Subscriber, Subscription, TimeScheduler,
        UNBOUNDED,
    };
}
