//! End-to-end behavior of the joined stream over in-memory sources.

#![allow(clippy::unwrap_used)]

use geoflow_core::{CompositeEntry, CompositeSnapshot, Key, SourceError};
use geoflow_stream::GeoFlow;
use geoflow_testkit::{init_test_tracing, loc, MockMembershipSource, MockValueSource};
use std::sync::Arc;
use tokio_test::{assert_pending, assert_ready_eq, task};

fn snapshot(entries: &[(&str, (f64, f64), Option<&str>)]) -> CompositeSnapshot<String> {
    entries
        .iter()
        .map(|(key, (lat, lon), value)| {
            (
                Key::from(*key),
                CompositeEntry::new(loc(*lat, *lon), value.map(str::to_owned)),
            )
        })
        .collect()
}

#[test]
fn enter_value_exit_lifecycle() {
    init_test_tracing();
    let membership = Arc::new(MockMembershipSource::new());
    let values = Arc::new(MockValueSource::<String>::new());
    let flow = GeoFlow::new(membership.clone());
    let mut joined = task::spawn(flow.with_values(values.clone()));

    assert_pending!(joined.poll_next());
    membership.ready();
    assert_ready_eq!(joined.poll_next(), Some(Ok(CompositeSnapshot::default())));

    values.set_current("a", "x".to_string());
    membership.enter("a", loc(1.0, 1.0));
    assert_ready_eq!(
        joined.poll_next(),
        Some(Ok(snapshot(&[("a", (1.0, 1.0), None)])))
    );
    assert_ready_eq!(
        joined.poll_next(),
        Some(Ok(snapshot(&[("a", (1.0, 1.0), Some("x"))])))
    );
    assert_eq!(values.active_count("a"), 1);

    membership.exit("a");
    assert_ready_eq!(joined.poll_next(), Some(Ok(CompositeSnapshot::default())));
    assert_eq!(values.active_count("a"), 0);
    assert_eq!(values.unsubscribe_count("a"), 1);
    assert_pending!(joined.poll_next());
}

#[test]
fn value_error_terminates_join() {
    init_test_tracing();
    let membership = Arc::new(MockMembershipSource::new());
    let values = Arc::new(MockValueSource::<String>::new());
    let flow = GeoFlow::new(membership.clone());
    let mut joined = task::spawn(flow.with_values(values.clone()));

    assert_pending!(joined.poll_next());
    membership.enter("a", loc(1.0, 1.0));
    membership.enter("b", loc(2.0, 2.0));
    membership.ready();
    assert_ready_eq!(
        joined.poll_next(),
        Some(Ok(snapshot(&[("a", (1.0, 1.0), None), ("b", (2.0, 2.0), None)])))
    );

    // Opens both value subscriptions.
    assert_pending!(joined.poll_next());
    assert_eq!(values.total_active(), 2);

    values.set_current("a", "ok".to_string());
    assert_ready_eq!(
        joined.poll_next(),
        Some(Ok(snapshot(&[("a", (1.0, 1.0), Some("ok")), ("b", (2.0, 2.0), None)])))
    );

    values.fail("b", "permission denied");
    assert_ready_eq!(
        joined.poll_next(),
        Some(Err(SourceError::value("b", "permission denied")))
    );
    assert_ready_eq!(joined.poll_next(), None);

    assert_eq!(values.total_active(), 0);
    assert_eq!(membership.active_count(), 0);

    values.set_current("a", "later".to_string());
    assert_ready_eq!(joined.poll_next(), None);
}

#[test]
fn membership_error_terminates_join() {
    let membership = Arc::new(MockMembershipSource::new());
    let values = Arc::new(MockValueSource::<String>::new());
    let flow = GeoFlow::new(membership.clone());
    let mut joined = task::spawn(flow.with_values(values.clone()));

    assert_pending!(joined.poll_next());
    membership.enter("a", loc(1.0, 1.0));
    membership.ready();
    assert!(joined.poll_next().is_ready());
    assert_pending!(joined.poll_next());
    assert_eq!(values.active_count("a"), 1);

    membership.fail("index offline");
    assert_ready_eq!(
        joined.poll_next(),
        Some(Err(SourceError::membership("index offline")))
    );
    assert_ready_eq!(joined.poll_next(), None);
    assert_eq!(values.active_count("a"), 0);
}

#[test]
fn dropping_join_releases_every_subscription() {
    let membership = Arc::new(MockMembershipSource::new());
    let values = Arc::new(MockValueSource::<String>::new());
    let flow = GeoFlow::new(membership.clone());
    let mut joined = task::spawn(flow.with_values(values.clone()));

    assert_pending!(joined.poll_next());
    for key in ["a", "b", "c"] {
        membership.enter(key, loc(0.0, 0.0));
    }
    membership.ready();
    assert!(joined.poll_next().is_ready());
    assert_pending!(joined.poll_next());
    assert_eq!(values.total_active(), 3);

    drop(joined);
    assert_eq!(values.total_active(), 0);
    assert_eq!(membership.active_count(), 0);
    for key in ["a", "b", "c"] {
        assert_eq!(values.subscribe_count(key), 1);
        assert_eq!(values.unsubscribe_count(key), 1);
    }
}

#[test]
fn reentry_opens_a_fresh_subscription() {
    let membership = Arc::new(MockMembershipSource::new());
    let values = Arc::new(MockValueSource::<String>::new());
    values.set_current("a", "x".to_string());
    let flow = GeoFlow::new(membership.clone());
    let mut joined = task::spawn(flow.with_values(values.clone()));

    assert_pending!(joined.poll_next());
    membership.ready();
    membership.enter("a", loc(1.0, 1.0));
    membership.exit("a");
    membership.enter("a", loc(3.0, 3.0));

    assert_ready_eq!(joined.poll_next(), Some(Ok(CompositeSnapshot::default())));
    assert_ready_eq!(
        joined.poll_next(),
        Some(Ok(snapshot(&[("a", (1.0, 1.0), None)])))
    );
    assert_ready_eq!(joined.poll_next(), Some(Ok(CompositeSnapshot::default())));
    // The value from the first entry never reaches the second.
    assert_ready_eq!(
        joined.poll_next(),
        Some(Ok(snapshot(&[("a", (3.0, 3.0), None)])))
    );
    assert_ready_eq!(
        joined.poll_next(),
        Some(Ok(snapshot(&[("a", (3.0, 3.0), Some("x"))])))
    );
    assert_eq!(values.subscribe_count("a"), 1);
    assert_eq!(values.active_count("a"), 1);
}
