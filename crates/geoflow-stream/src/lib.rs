//! Geoflow Stream - live membership, joined values and typed projection
//!
//! Layers, each a lazy [`futures::Stream`] that subscribes on first poll and
//! releases everything it opened when dropped:
//!
//! 1. [`MembershipAggregator`]: membership events → [`MembershipSnapshot`]s
//! 2. [`join`]: snapshots → [`CompositeSnapshot`]s with one value stream per key
//! 3. [`project`]: composite snapshots → typed snapshots via a [`Decoder`]
//!
//! [`GeoFlow`] wires the three together over a [`GeoflowConfig`].
//!
//! No task is spawned anywhere; all work happens inside `poll_next` of the
//! stream the caller holds, so any executor can drive it.
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use geoflow_stream::GeoFlow;
//! use geoflow_testkit::{loc, MockMembershipSource, MockValueSource};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let membership = Arc::new(MockMembershipSource::new());
//! let values = MockValueSource::<String>::new();
//! let flow = GeoFlow::new(membership.clone());
//! let mut joined = flow.with_values(values);
//!
//! membership.enter("a", loc(1.0, 1.0));
//! membership.ready();
//! while let Some(Ok(snapshot)) = joined.next().await {
//!     println!("{} members", snapshot.len());
//! }
//! # }
//! ```
//!
//! [`MembershipSnapshot`]: geoflow_core::MembershipSnapshot
//! [`CompositeSnapshot`]: geoflow_core::CompositeSnapshot
//! [`Decoder`]: geoflow_core::Decoder
//! [`GeoflowConfig`]: geoflow_core::GeoflowConfig

#![forbid(unsafe_code)]

/// Entry point facade
pub mod geoflow;

/// Per-key fan-out joiner
pub mod join;

/// Membership aggregation
pub mod membership;

/// Typed projection
pub mod projection;

/// Value source adapter
pub mod value;

pub use geoflow::GeoFlow;
pub use join::{join, CompositeStream};
pub use membership::{MembershipAggregator, MembershipStream};
pub use projection::{
    decode_snapshot, filter_data_present, project, project_list, retain_present, PresentSnapshot,
    TypedSnapshot,
};
pub use value::ValueStream;

pub use geoflow_core;
