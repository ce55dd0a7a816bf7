//! # Membership Aggregator
//!
//! Adapts a push-based [`MembershipSource`] into a stream of
//! [`MembershipSnapshot`]s.
//!
//! ## Serialization
//!
//! Source callbacks may arrive on any thread. They only enqueue the event into
//! an unbounded single-consumer channel; the map is mutated exclusively inside
//! `poll_next`, so applying an event and deciding whether to emit is atomic.
//!
//! ## Emission
//!
//! Events before `Ready` are applied silently. `Ready` and every later event
//! each yield one full snapshot. An `Error` event yields the error once and
//! ends the stream.

use futures::Stream;
use geoflow_core::reactive::MembershipState;
use geoflow_core::{
    GeoflowConfig, MembershipEvent, MembershipListener, MembershipSnapshot, MembershipSource,
    SourceError, SourceHandle,
};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Entry point for membership snapshots over one source.
///
/// Every call to [`observe`](Self::observe) creates an independent
/// subscription with its own map.
pub struct MembershipAggregator<S> {
    source: Arc<S>,
    trace_snapshots: bool,
}

impl<S> Clone for MembershipAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            trace_snapshots: self.trace_snapshots,
        }
    }
}

impl<S: MembershipSource> MembershipAggregator<S> {
    /// Aggregator over `source`.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            trace_snapshots: false,
        }
    }

    /// Aggregator over `source` honoring `config`.
    pub fn with_config(source: Arc<S>, config: &GeoflowConfig) -> Self {
        Self {
            source,
            trace_snapshots: config.trace_snapshots,
        }
    }

    /// Lazy stream of snapshots. The source is subscribed on first poll and
    /// released when the stream is dropped.
    pub fn observe(&self) -> MembershipStream<S> {
        MembershipStream {
            source: self.source.clone(),
            state: MembershipState::new(),
            phase: Phase::Idle,
            trace_snapshots: self.trace_snapshots,
        }
    }
}

enum Phase {
    Idle,
    Subscribed {
        handle: SourceHandle,
        events: mpsc::UnboundedReceiver<MembershipEvent>,
    },
    Failed(SourceError),
    Closed,
}

/// Stream of membership snapshots for one subscription.
pub struct MembershipStream<S: MembershipSource> {
    source: Arc<S>,
    state: MembershipState,
    phase: Phase,
    trace_snapshots: bool,
}

impl<S: MembershipSource> MembershipStream<S> {
    /// Whether the source has signalled the end of initial load.
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    fn subscribe(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = MembershipListener::new(move |event| {
            // Fails only after the stream is dropped; late events are discarded.
            let _ = tx.send(event);
        });

        self.phase = match self.source.subscribe(listener) {
            Ok(handle) => {
                tracing::debug!("membership subscription opened");
                Phase::Subscribed { handle, events: rx }
            }
            Err(error) => {
                tracing::warn!(%error, "membership subscription refused");
                Phase::Failed(error)
            }
        };
    }

    fn close(&mut self) {
        if let Phase::Subscribed { mut handle, .. } =
            std::mem::replace(&mut self.phase, Phase::Closed)
        {
            handle.unsubscribe();
            tracing::debug!(members = self.state.len(), "membership subscription released");
        }
    }
}

impl<S: MembershipSource> Stream for MembershipStream<S> {
    type Item = Result<MembershipSnapshot, SourceError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if matches!(this.phase, Phase::Idle) {
            this.subscribe();
        }

        loop {
            let event = match &mut this.phase {
                Phase::Idle | Phase::Closed => return Poll::Ready(None),
                Phase::Failed(_) => {
                    let Phase::Failed(error) = std::mem::replace(&mut this.phase, Phase::Closed)
                    else {
                        return Poll::Ready(None);
                    };
                    return Poll::Ready(Some(Err(error)));
                }
                Phase::Subscribed { events, .. } => match events.poll_recv(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(None) => {
                        tracing::debug!("membership source closed its listener");
                        this.close();
                        return Poll::Ready(None);
                    }
                    Poll::Ready(Some(event)) => event,
                },
            };

            match this.state.apply(event) {
                Ok(Some(snapshot)) => {
                    if this.trace_snapshots {
                        tracing::trace!(members = snapshot.len(), ?snapshot, "membership snapshot");
                    }
                    return Poll::Ready(Some(Ok(snapshot)));
                }
                Ok(None) => continue,
                Err(error) => {
                    tracing::warn!(%error, "membership source failed");
                    this.close();
                    return Poll::Ready(Some(Err(error)));
                }
            }
        }
    }
}

impl<S: MembershipSource> Drop for MembershipStream<S> {
    fn drop(&mut self) {
        self.close();
    }
}
