//! Value stream adapter
//!
//! Turns one [`ValueSource`] registration into a lazy stream of values. The
//! subscription is opened on first poll and released when the stream is
//! dropped or after the source reports an error.

use futures::Stream;
use geoflow_core::{SourceError, SourceHandle, ValueAddress, ValueListener, ValueSource};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

enum Phase<V> {
    Idle,
    Open {
        handle: SourceHandle,
        updates: mpsc::UnboundedReceiver<Result<V, SourceError>>,
    },
    Failed(SourceError),
    Closed,
}

/// Stream of values delivered for one address.
pub struct ValueStream<S: ValueSource> {
    source: Arc<S>,
    address: ValueAddress,
    phase: Phase<S::Value>,
}

// No field is structurally pinned.
impl<S: ValueSource> Unpin for ValueStream<S> {}

impl<S: ValueSource> ValueStream<S> {
    /// Stream for `address`. Nothing is subscribed until first poll.
    pub fn open(source: Arc<S>, address: ValueAddress) -> Self {
        Self {
            source,
            address,
            phase: Phase::Idle,
        }
    }

    /// Address this stream observes.
    pub fn address(&self) -> &ValueAddress {
        &self.address
    }

    fn subscribe(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = ValueListener::new(move |update| {
            // The receiver is gone once the stream is dropped; late callbacks are discarded.
            let _ = tx.send(update);
        });

        self.phase = match self.source.subscribe(&self.address, listener) {
            Ok(handle) => {
                tracing::debug!(address = %self.address, "value subscription opened");
                Phase::Open {
                    handle,
                    updates: rx,
                }
            }
            Err(error) => {
                tracing::warn!(address = %self.address, %error, "value subscription refused");
                Phase::Failed(error)
            }
        };
    }

    fn close(&mut self) {
        if let Phase::Open { mut handle, .. } = std::mem::replace(&mut self.phase, Phase::Closed) {
            handle.unsubscribe();
            tracing::debug!(address = %self.address, "value subscription released");
        }
    }
}

impl<S: ValueSource> Stream for ValueStream<S> {
    type Item = Result<S::Value, SourceError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if matches!(this.phase, Phase::Idle) {
            this.subscribe();
        }

        let update = match &mut this.phase {
            Phase::Idle | Phase::Closed => return Poll::Ready(None),
            Phase::Failed(_) => {
                let Phase::Failed(error) = std::mem::replace(&mut this.phase, Phase::Closed) else {
                    return Poll::Ready(None);
                };
                return Poll::Ready(Some(Err(error)));
            }
            Phase::Open { updates, .. } => match updates.poll_recv(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(update) => update,
            },
        };

        match update {
            Some(Ok(value)) => Poll::Ready(Some(Ok(value))),
            Some(Err(error)) => {
                tracing::warn!(address = %this.address, %error, "value source failed");
                this.close();
                Poll::Ready(Some(Err(error)))
            }
            None => {
                this.close();
                Poll::Ready(None)
            }
        }
    }
}

impl<S: ValueSource> Drop for ValueStream<S> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use geoflow_testkit::MockValueSource;

    #[tokio::test]
    async fn test_lazy_subscription() {
        let source = Arc::new(MockValueSource::<String>::new());
        let mut stream = ValueStream::open(source.clone(), ValueAddress::from("users/a"));

        assert_eq!(source.subscribe_count("users/a"), 0);

        source.set_current("users/a", "x".to_string());
        assert_eq!(stream.next().await, Some(Ok("x".to_string())));
        assert_eq!(source.subscribe_count("users/a"), 1);
        assert_eq!(source.active_count("users/a"), 1);

        drop(stream);
        assert_eq!(source.active_count("users/a"), 0);
        assert_eq!(source.unsubscribe_count("users/a"), 1);
    }

    #[tokio::test]
    async fn test_error_terminates_and_releases() {
        let source = Arc::new(MockValueSource::<String>::new());
        let mut stream = ValueStream::open(source.clone(), ValueAddress::from("users/b"));

        source.set_current("users/b", "first".to_string());
        assert_eq!(stream.next().await, Some(Ok("first".to_string())));

        source.fail("users/b", "permission denied");
        assert_eq!(
            stream.next().await,
            Some(Err(SourceError::value("users/b", "permission denied")))
        );
        assert_eq!(stream.next().await, None);
        assert_eq!(source.active_count("users/b"), 0);
    }

    #[tokio::test]
    async fn test_refused_subscription_yields_error_once() {
        let source = Arc::new(MockValueSource::<String>::new());
        source.refuse("users/c", "no such path");
        let mut stream = ValueStream::open(source.clone(), ValueAddress::from("users/c"));

        assert_eq!(
            stream.next().await,
            Some(Err(SourceError::value("users/c", "no such path")))
        );
        assert_eq!(stream.next().await, None);
    }
}
