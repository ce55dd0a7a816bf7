//! Geoflow Testing Infrastructure
//!
//! In-memory sources and fixtures shared by the geoflow test suites.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! geoflow-testkit = { path = "../geoflow-testkit" }
//! ```
//!
//! ```rust,no_run
//! use geoflow_testkit::*;
//!
//! let membership = MockMembershipSource::new();
//! membership.enter("a", loc(1.0, 2.0));
//! membership.ready();
//! ```

pub mod fixtures;
pub mod mocks;
pub mod strategies;

pub use fixtures::*;
pub use mocks::*;
