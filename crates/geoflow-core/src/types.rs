//! Snapshot data model
//!
//! Everything here is an immutable value: a snapshot is a fully materialized
//! view of one instant, never a delta.

use crate::errors::{GeoflowError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque member identifier, unique within one membership subscription.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Wrap a raw identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace-only keys cannot address a value.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Key {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A (latitude, longitude) pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees, [-90, 90]
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180]
    pub longitude: f64,
}

impl Location {
    /// Create a location without range checks.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a location, rejecting out-of-range or non-finite coordinates.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self> {
        let location = Self::new(latitude, longitude);
        if location.is_valid() {
            Ok(location)
        } else {
            Err(GeoflowError::invalid(format!(
                "location out of range: ({latitude}, {longitude})"
            )))
        }
    }

    /// Whether both coordinates are finite and inside their ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// The full set of keys inside the query region and where each one is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    locations: BTreeMap<Key, Location>,
}

impl MembershipSnapshot {
    /// Snapshot a key → location map.
    pub fn new(locations: BTreeMap<Key, Location>) -> Self {
        Self { locations }
    }

    /// Location of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Location> {
        self.locations.get(key)
    }

    /// Whether `key` is a member.
    pub fn contains_key(&self, key: &str) -> bool {
        self.locations.contains_key(key)
    }

    /// Member keys in order.
    pub fn keys(&self) -> btree_map::Keys<'_, Key, Location> {
        self.locations.keys()
    }

    /// Members in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, Key, Location> {
        self.locations.iter()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the region is empty.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &BTreeMap<Key, Location> {
        &self.locations
    }

    /// Take the underlying map.
    pub fn into_inner(self) -> BTreeMap<Key, Location> {
        self.locations
    }
}

impl FromIterator<(Key, Location)> for MembershipSnapshot {
    fn from_iter<I: IntoIterator<Item = (Key, Location)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MembershipSnapshot {
    type Item = (&'a Key, &'a Location);
    type IntoIter = btree_map::Iter<'a, Key, Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.locations.iter()
    }
}

/// One member of a joined snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeEntry<V> {
    /// Latest known location
    pub location: Location,
    /// Latest value from the member's value source, `None` until it emits
    pub secondary: Option<V>,
}

impl<V> CompositeEntry<V> {
    /// Create an entry.
    pub fn new(location: Location, secondary: Option<V>) -> Self {
        Self {
            location,
            secondary,
        }
    }
}

/// Naming used by callers that think in terms of raw database snapshots.
pub type LocationDataSnapshot<V> = CompositeEntry<V>;

/// Key → [`CompositeEntry`], the unit emitted by the joiner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSnapshot<V> {
    entries: BTreeMap<Key, CompositeEntry<V>>,
}

impl<V> Default for CompositeSnapshot<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> CompositeSnapshot<V> {
    /// Snapshot a key → entry map.
    pub fn new(entries: BTreeMap<Key, CompositeEntry<V>>) -> Self {
        Self { entries }
    }

    /// Entry for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&CompositeEntry<V>> {
        self.entries.get(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in order.
    pub fn keys(&self) -> btree_map::Keys<'_, Key, CompositeEntry<V>> {
        self.entries.keys()
    }

    /// Entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, Key, CompositeEntry<V>> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take the underlying map.
    pub fn into_inner(self) -> BTreeMap<Key, CompositeEntry<V>> {
        self.entries
    }
}

impl<V> FromIterator<(Key, CompositeEntry<V>)> for CompositeSnapshot<V> {
    fn from_iter<I: IntoIterator<Item = (Key, CompositeEntry<V>)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<V> IntoIterator for CompositeSnapshot<V> {
    type Item = (Key, CompositeEntry<V>);
    type IntoIter = btree_map::IntoIter<Key, CompositeEntry<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A location paired with typed data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData<T> {
    /// Latest known location
    pub location: Location,
    /// Typed data for the member
    pub data: T,
}

impl<T> LocationData<T> {
    /// Create a location/data pair.
    pub fn new(location: Location, data: T) -> Self {
        Self { location, data }
    }
}
