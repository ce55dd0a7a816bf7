//! Typed projection of composite snapshots
//!
//! Every emission is decoded in full; nothing is cached between emissions.
//! A value that fails to decode, or that has not arrived yet, becomes `None`
//! and the member stays in the output. [`filter_data_present`] and
//! [`project_list`] drop those members afterwards.

use futures::{Stream, StreamExt};
use geoflow_core::{CompositeSnapshot, Decoder, Key, Location, LocationData, SourceError};
use std::collections::BTreeMap;

/// Key → location plus typed data, `None` where decoding was not possible.
pub type TypedSnapshot<T> = BTreeMap<Key, LocationData<Option<T>>>;

/// Key → location plus data, with absent data already removed.
pub type PresentSnapshot<T> = BTreeMap<Key, LocationData<T>>;

/// Decode one composite snapshot.
pub fn decode_snapshot<V, D>(decoder: &D, composite: CompositeSnapshot<V>) -> TypedSnapshot<D::Output>
where
    D: Decoder<V>,
{
    composite
        .into_iter()
        .map(|(key, entry)| {
            let data = entry.secondary.as_ref().and_then(|raw| match decoder.decode(raw) {
                Ok(value) => Some(value),
                Err(failure) => {
                    tracing::trace!(%key, %failure, "value did not decode");
                    None
                }
            });
            (key, LocationData::new(entry.location, data))
        })
        .collect()
}

/// Drop members whose data is absent.
pub fn retain_present<T>(typed: TypedSnapshot<T>) -> PresentSnapshot<T> {
    typed
        .into_iter()
        .filter_map(|(key, entry)| {
            let location = entry.location;
            entry.data.map(|data| (key, LocationData::new(location, data)))
        })
        .collect()
}

/// Decode every emission of `composite` with `decoder`.
///
/// Errors pass through unchanged; the upstream stream ends after yielding one.
pub fn project<S, V, D>(
    composite: S,
    decoder: D,
) -> impl Stream<Item = Result<TypedSnapshot<D::Output>, SourceError>>
where
    S: Stream<Item = Result<CompositeSnapshot<V>, SourceError>>,
    D: Decoder<V>,
{
    composite.map(move |item| item.map(|snapshot| decode_snapshot(&decoder, snapshot)))
}

/// Keep only members with decoded data.
pub fn filter_data_present<S, T>(
    typed: S,
) -> impl Stream<Item = Result<PresentSnapshot<T>, SourceError>>
where
    S: Stream<Item = Result<TypedSnapshot<T>, SourceError>>,
{
    typed.map(|item| item.map(retain_present))
}

/// Decode, drop absent data, and flatten each emission into a list with
/// `combiner`. The list follows key order.
pub fn project_list<S, V, D, C, U>(
    composite: S,
    decoder: D,
    mut combiner: C,
) -> impl Stream<Item = Result<Vec<U>, SourceError>>
where
    S: Stream<Item = Result<CompositeSnapshot<V>, SourceError>>,
    D: Decoder<V>,
    C: FnMut(Key, Location, D::Output) -> U,
{
    filter_data_present(project(composite, decoder)).map(move |item| {
        item.map(|present| {
            present
                .into_iter()
                .map(|(key, entry)| combiner(key, entry.location, entry.data))
                .collect()
        })
    })
}
