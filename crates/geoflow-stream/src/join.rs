//! # Per-Key Fan-out Joiner
//!
//! Keeps one value stream open per member key and recombines the latest value
//! of every member with its latest location.
//!
//! ## Incremental fan-out
//!
//! Each membership snapshot is diffed against the current member set:
//! - added keys get a fresh value stream from the opener
//! - removed keys have their stream dropped (cancelled) and their value
//!   discarded before any value stream is polled again
//! - kept keys keep their stream untouched
//!
//! ## Emission
//!
//! A composite snapshot is emitted for every membership snapshot (including
//! an empty one) and for every value yielded by any open value stream.
//!
//! ## Failure
//!
//! The first error from membership or any value stream is yielded once,
//! every open stream is dropped, and the composite stream ends. A value
//! stream that ends while its key is still a member counts as a failure of
//! that key's value source.

use futures::stream::{self, BoxStream};
use futures::{future, Stream, StreamExt};
use geoflow_core::reactive::KeySetDiff;
use geoflow_core::{CompositeEntry, CompositeSnapshot, Key, MembershipSnapshot, SourceError};
use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_stream::StreamMap;

/// One value stream item, or `None` once the stream has ended.
type ValueUpdate<V> = Option<Result<V, SourceError>>;

type ValueOpener<V> = Box<dyn FnMut(&Key) -> BoxStream<'static, ValueUpdate<V>> + Send>;

/// Join `membership` with one value stream per member, opened by `open_value`.
///
/// `open_value` is called exactly once per key entry; a key that exits and
/// later re-enters gets a new stream.
pub fn join<M, V, F, VS>(membership: M, mut open_value: F) -> CompositeStream<V>
where
    M: Stream<Item = Result<MembershipSnapshot, SourceError>> + Send + 'static,
    V: Clone + Send + 'static,
    F: FnMut(&Key) -> VS + Send + 'static,
    VS: Stream<Item = Result<V, SourceError>> + Send + 'static,
{
    CompositeStream {
        membership: Some(membership.boxed()),
        open_value: Box::new(move |key| {
            open_value(key)
                .map(Some)
                .chain(stream::once(future::ready(None)))
                .boxed()
        }),
        values: StreamMap::new(),
        members: BTreeMap::new(),
        trace_snapshots: false,
    }
}

/// Stream of [`CompositeSnapshot`]s produced by [`join`].
pub struct CompositeStream<V> {
    membership: Option<BoxStream<'static, Result<MembershipSnapshot, SourceError>>>,
    open_value: ValueOpener<V>,
    values: StreamMap<Key, BoxStream<'static, ValueUpdate<V>>>,
    members: BTreeMap<Key, CompositeEntry<V>>,
    trace_snapshots: bool,
}

// No field is structurally pinned.
impl<V> Unpin for CompositeStream<V> {}

impl<V: Clone + Send + 'static> CompositeStream<V> {
    /// Log every emitted composite snapshot at `trace` level.
    pub fn trace_snapshots(mut self, enabled: bool) -> Self {
        self.trace_snapshots = enabled;
        self
    }

    /// Number of value streams currently open.
    pub fn open_value_streams(&self) -> usize {
        self.values.len()
    }

    fn apply_membership(&mut self, snapshot: MembershipSnapshot) {
        let next: BTreeMap<Key, _> = snapshot
            .into_inner()
            .into_iter()
            .filter(|(key, _)| {
                if key.is_blank() {
                    tracing::debug!(key = ?key.as_str(), "skipping blank member key");
                }
                !key.is_blank()
            })
            .collect();

        let diff = KeySetDiff::between(self.members.keys(), next.keys());

        // Removal drops the stream, which releases its source subscription.
        for key in &diff.removed {
            self.values.remove(key);
            self.members.remove(key);
        }
        for key in &diff.added {
            let stream = (self.open_value)(key);
            self.values.insert(key.clone(), stream);
        }

        for (key, location) in next {
            self.members
                .entry(key)
                .and_modify(|entry| entry.location = location)
                .or_insert_with(|| CompositeEntry::new(location, None));
        }

        if !diff.is_unchanged() {
            tracing::debug!(
                added = diff.added.len(),
                kept = diff.kept.len(),
                removed = diff.removed.len(),
                open = self.values.len(),
                "member set changed"
            );
        }
    }

    fn apply_value(&mut self, key: Key, value: V) {
        match self.members.get_mut(&key) {
            Some(entry) => entry.secondary = Some(value),
            None => tracing::warn!(%key, "value for a key that is not a member"),
        }
    }

    fn snapshot(&self) -> CompositeSnapshot<V> {
        let snapshot = CompositeSnapshot::new(self.members.clone());
        if self.trace_snapshots {
            tracing::trace!(members = snapshot.len(), "composite snapshot");
        }
        snapshot
    }

    fn shutdown(&mut self) {
        self.membership = None;
        self.values = StreamMap::new();
        self.members.clear();
    }
}

impl<V: Clone + Send + 'static> Stream for CompositeStream<V> {
    type Item = Result<CompositeSnapshot<V>, SourceError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        let Some(membership) = this.membership.as_mut() else {
            return Poll::Ready(None);
        };

        // Membership first: removals must take effect before stale values are polled.
        match membership.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(snapshot))) => {
                this.apply_membership(snapshot);
                return Poll::Ready(Some(Ok(this.snapshot())));
            }
            Poll::Ready(Some(Err(error))) => {
                tracing::warn!(%error, "membership failed, closing join");
                this.shutdown();
                return Poll::Ready(Some(Err(error)));
            }
            Poll::Ready(None) => {
                tracing::debug!("membership ended, closing join");
                this.shutdown();
                return Poll::Ready(None);
            }
            Poll::Pending => {}
        }

        match this.values.poll_next_unpin(cx) {
            Poll::Ready(Some((key, Some(Ok(value))))) => {
                this.apply_value(key, value);
                Poll::Ready(Some(Ok(this.snapshot())))
            }
            Poll::Ready(Some((key, Some(Err(error))))) => {
                tracing::warn!(%key, %error, "member value failed, closing join");
                this.shutdown();
                Poll::Ready(Some(Err(error)))
            }
            // Removed keys are dropped before polling, so the key is still a member.
            Poll::Ready(Some((key, None))) => {
                tracing::warn!(%key, "member value stream ended, closing join");
                this.shutdown();
                Poll::Ready(Some(Err(SourceError::value(
                    key.as_str(),
                    "value stream ended while the key was a member",
                ))))
            }
            // No open value streams; membership has registered the waker.
            Poll::Ready(None) | Poll::Pending => Poll::Pending,
        }
    }
}
