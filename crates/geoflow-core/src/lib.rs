//! Geoflow Core - data model and source interfaces
//!
//! This crate holds everything the stream layers share but that has no
//! runtime dependency:
//!
//! ## Data Model
//! - [`Key`], [`Location`]: member identity and position
//! - [`MembershipSnapshot`]: key → location for the whole query region
//! - [`CompositeSnapshot`]: key → location plus the member's latest value
//! - [`LocationData`]: location plus typed data, produced by projection
//!
//! ## Source Interfaces
//! - [`MembershipSource`]: enter/exit/move/ready/error events for a region
//! - [`ValueSource`]: changing values at a [`ValueAddress`]
//! - [`Decoder`]: pure raw → typed conversion
//!
//! ## Reactive Primitives
//! - [`reactive::MembershipState`]: the "apply event, maybe emit" step
//! - [`reactive::KeySetDiff`]: added/kept/removed partition of key sets

#![forbid(unsafe_code)]

/// Configuration loading and validation
pub mod config;

/// Typed decoding of secondary values
pub mod decode;

/// Error taxonomy
pub mod errors;

/// Reactive primitives driven by the stream layers
pub mod reactive;

/// External source traits and listener plumbing
pub mod sources;

/// Snapshot data model
pub mod types;

pub use config::GeoflowConfig;
pub use decode::{Decoder, JsonDecoder};
pub use errors::{DecodeFailure, GeoflowError, Result, SourceError};
pub use sources::{
    MembershipEvent, MembershipListener, MembershipListenerBuilder, MembershipSource,
    SourceHandle, ValueAddress, ValueListener, ValueListenerBuilder, ValueSource,
};
pub use types::{
    CompositeEntry, CompositeSnapshot, Key, Location, LocationData, LocationDataSnapshot,
    MembershipSnapshot,
};
