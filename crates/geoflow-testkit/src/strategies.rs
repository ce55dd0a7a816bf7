//! Property test strategies for geoflow types
//!
//! Keys are drawn from a small alphabet so generated event sequences revisit
//! the same members often.

use geoflow_core::{Key, Location, MembershipEvent};
use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

/// Strategy for member keys from a pool of eight.
///
/// # Example
///
/// ```rust
/// use geoflow_testkit::strategies::arb_key;
/// use proptest::prelude::*;
///
/// proptest! {
///     #[test]
///     fn test_key_property(key in arb_key()) {
///         assert!(!key.is_blank());
///     }
/// }
/// ```
pub fn arb_key() -> impl Strategy<Value = Key> {
    (0u8..8).prop_map(|n| Key::new(format!("k{n}")))
}

/// Strategy for in-range locations.
pub fn arb_location() -> impl Strategy<Value = Location> {
    (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lon)| Location::new(lat, lon))
}

/// Strategy for one non-terminal membership event.
pub fn arb_membership_event() -> impl Strategy<Value = MembershipEvent> {
    prop_oneof![
        3 => (arb_key(), arb_location())
            .prop_map(|(key, location)| MembershipEvent::KeyEntered { key, location }),
        2 => arb_key().prop_map(|key| MembershipEvent::KeyExited { key }),
        2 => (arb_key(), arb_location())
            .prop_map(|(key, location)| MembershipEvent::KeyMoved { key, location }),
        1 => Just(MembershipEvent::Ready),
    ]
}

/// Strategy for sequences of up to `max_len` non-terminal membership events.
pub fn arb_membership_events(max_len: usize) -> impl Strategy<Value = Vec<MembershipEvent>> {
    prop::collection::vec(arb_membership_event(), 0..=max_len)
}
