//! MembershipState - the aggregator's mutable map
//!
//! Events mutate the map silently until `Ready` has been seen once. From then
//! on every event yields a full snapshot of the map.

use crate::errors::SourceError;
use crate::sources::MembershipEvent;
use crate::types::{Key, Location, MembershipSnapshot};
use std::collections::BTreeMap;

/// Key → location map of one membership subscription.
#[derive(Debug, Clone, Default)]
pub struct MembershipState {
    locations: BTreeMap<Key, Location>,
    ready: bool,
}

impl MembershipState {
    /// Empty state, not ready.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `Ready` has been observed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Apply one event.
    ///
    /// Returns `Ok(Some(snapshot))` when the event should be emitted,
    /// `Ok(None)` while still loading, and `Err` for a source failure.
    pub fn apply(
        &mut self,
        event: MembershipEvent,
    ) -> Result<Option<MembershipSnapshot>, SourceError> {
        match event {
            MembershipEvent::KeyEntered { key, location }
            | MembershipEvent::KeyMoved { key, location } => {
                self.locations.insert(key, location);
            }
            MembershipEvent::KeyExited { key } => {
                self.locations.remove(&key);
            }
            MembershipEvent::Ready => {
                self.ready = true;
            }
            MembershipEvent::Error(error) => return Err(error),
        }

        Ok(self.ready.then(|| self.snapshot()))
    }

    /// Copy of the current map, regardless of readiness.
    pub fn snapshot(&self) -> MembershipSnapshot {
        MembershipSnapshot::new(self.locations.clone())
    }
}
