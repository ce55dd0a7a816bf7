//! # Reactive Primitives
//!
//! Building blocks shared by the membership and join layers.
//!
//! - [`KeySetDiff`]: the added/kept/removed partition applied on every
//!   membership change.
//! - [`MembershipState`]: the aggregator's key → location map plus its
//!   ready flag, with the "apply event, maybe emit" step.
//!
//! Both are plain data with no runtime dependency. Stream adapters in
//! `geoflow-stream` drive them from inside `poll_next`.

mod diff;
mod membership;

pub use diff::KeySetDiff;
pub use membership::MembershipState;
