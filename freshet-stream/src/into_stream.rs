// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Bridge from a publisher into a [`futures::Stream`].
//!
//! The bridge subscribes with unbounded demand and relays every signal
//! through an unbounded channel, so it buffers as fast as the source emits;
//! backpressure-aware consumption stays on the subscriber side of the
//! library. Items arrive as `Result<T, FreshetError>` and the stream ends
//! after the terminal signal.
//!
//! ```
//! use freshet_stream::prelude::*;
//! use futures::StreamExt;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let values: Vec<_> = range(1, 3).into_stream().collect().await;
//! assert_eq!(values.len(), 3);
//! # }
//! ```

use freshet_core::{
    FreshetError, Publisher, Subscriber, Subscription, SubscriptionSlot, UNBOUNDED,
};
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Conversion into a [`futures::Stream`].
pub trait IntoStreamExt<T>: Publisher<T> + Sized + 'static {
    /// Subscribe with unbounded demand and expose the signals as an async
    /// stream of `Result`.
    fn into_stream(self) -> PublisherStream<T>;
}

impl<T, P> IntoStreamExt<T> for P
where
    T: Send + 'static,
    P: Publisher<T> + Sized + 'static,
{
    fn into_stream(self) -> PublisherStream<T> {
        let (sender, receiver) = async_channel::unbounded();
        let subscriber = Arc::new(ChannelSubscriber {
            sender,
            upstream: SubscriptionSlot::new(),
        });
        self.subscribe(subscriber);
        PublisherStream { receiver }
    }
}

/// Stream returned by [`IntoStreamExt::into_stream`].
pub struct PublisherStream<T> {
    receiver: async_channel::Receiver<Result<T, FreshetError>>,
}

impl<T> Stream for PublisherStream<T> {
    type Item = Result<T, FreshetError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let receiver = unsafe { self.map_unchecked_mut(|s| &mut s.receiver) };
        receiver.poll_next(cx)
    }
}

struct ChannelSubscriber<T> {
    sender: async_channel::Sender<Result<T, FreshetError>>,
    upstream: SubscriptionSlot,
}

impl<T: Send + 'static> Subscriber<T> for ChannelSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        if self.upstream.set_once(subscription) {
            self.upstream.request(UNBOUNDED);
        }
    }

    fn on_next(&self, value: T) {
        // The consumer dropped the stream; detach from the source
        if self.sender.try_send(Ok(value)).is_err() {
            self.upstream.cancel();
        }
    }

    fn on_error(&self, error: FreshetError) {
        let _ = self.sender.try_send(Err(error));
        self.sender.close();
    }

    fn on_complete(&self) {
        self.sender.close();
    }
}
