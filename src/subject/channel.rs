use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::{
    BroadcastStream, UnboundedReceiverStream, errors::BroadcastStreamRecvError,
};
use tracing::trace;

use super::BufferPolicy;

/// Producer half of one subscriber's buffer, held in the subject registry.
///
/// Dropping it ends the subscriber's stream once buffered values are read.
pub(super) enum Sink<T> {
    Unbounded(mpsc::UnboundedSender<T>),
    Newest(broadcast::Sender<T>),
}

/// Consumer half, owned by the [`Subscription`](super::Subscription).
pub(super) enum Source<T> {
    Unbounded(UnboundedReceiverStream<T>),
    Newest(BroadcastStream<T>),
}

/// Creates the buffer for a new subscriber.
///
/// `Newest` is backed by a single-receiver broadcast channel: when the
/// consumer lags, the channel overwrites the oldest values, which is exactly
/// the keep-latest rule.
pub(super) fn channel<T>(policy: BufferPolicy) -> (Sink<T>, Source<T>)
where
    T: Clone + Send + 'static,
{
    match policy {
        BufferPolicy::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                Sink::Unbounded(tx),
                Source::Unbounded(UnboundedReceiverStream::new(rx)),
            )
        }
        BufferPolicy::Newest(limit) => {
            let (tx, rx) = broadcast::channel(limit.max(1));
            (Sink::Newest(tx), Source::Newest(BroadcastStream::new(rx)))
        }
    }
}

impl<T> Sink<T> {
    /// Enqueues a value without blocking. Values for a consumer that has
    /// already gone away are dropped.
    pub(super) fn push(&self, value: T) {
        match self {
            Sink::Unbounded(tx) => {
                let _ = tx.send(value);
            }
            Sink::Newest(tx) => {
                let _ = tx.send(value);
            }
        }
    }
}

impl<T> Stream for Source<T>
where
    T: Clone + Send + 'static,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        match self.get_mut() {
            Source::Unbounded(rx) => Pin::new(rx).poll_next(cx),
            Source::Newest(rx) => loop {
                match Pin::new(&mut *rx).poll_next(cx) {
                    Poll::Ready(Some(Ok(value))) => return Poll::Ready(Some(value)),
                    Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                        trace!(skipped, "discarded values for lagging subscriber");
                    }
                    Poll::Ready(None) => return Poll::Ready(None),
                    Poll::Pending => return Poll::Pending,
                }
            },
        }
    }
}
