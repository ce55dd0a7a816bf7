//! Entry point tying the stream layers together
//!
//! [`GeoFlow`] owns a membership source and a validated [`GeoflowConfig`]. Each
//! method returns an independent, lazily subscribed stream:
//!
//! - [`GeoFlow::locations`]: membership snapshots only
//! - [`GeoFlow::with_values`]: membership joined with one value stream per key
//! - [`GeoFlow::typed`] / [`GeoFlow::typed_with`]: joined and decoded
//! - [`GeoFlow::typed_list`]: joined, decoded, filtered and flattened

use crate::join::{join, CompositeStream};
use crate::membership::{MembershipAggregator, MembershipStream};
use crate::projection::{project, project_list, TypedSnapshot};
use crate::value::ValueStream;
use futures::Stream;
use geoflow_core::{
    Decoder, GeoflowConfig, JsonDecoder, Key, Location, MembershipSource, Result, SourceError,
    ValueAddress, ValueSource,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Live view over the members of one region query.
pub struct GeoFlow<M> {
    aggregator: MembershipAggregator<M>,
    config: GeoflowConfig,
}

impl<M> Clone for GeoFlow<M> {
    fn clone(&self) -> Self {
        Self {
            aggregator: self.aggregator.clone(),
            config: self.config.clone(),
        }
    }
}

impl<M: MembershipSource + 'static> GeoFlow<M> {
    /// Flow over `membership` with default configuration.
    pub fn new(membership: M) -> Self {
        Self {
            aggregator: MembershipAggregator::new(Arc::new(membership)),
            config: GeoflowConfig::default(),
        }
    }

    /// Flow over `membership` with `config`, rejected if it does not validate.
    pub fn with_config(membership: M, config: GeoflowConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            value_prefix = ?config.value_prefix,
            trace_snapshots = config.trace_snapshots,
            "geoflow configured"
        );
        Ok(Self {
            aggregator: MembershipAggregator::with_config(Arc::new(membership), &config),
            config,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &GeoflowConfig {
        &self.config
    }

    /// Membership snapshots for the region.
    pub fn locations(&self) -> MembershipStream<M> {
        self.aggregator.observe()
    }

    /// Membership joined with each member's value from `values`, addressed
    /// as `"{value_prefix}/{key}"`.
    pub fn with_values<S>(&self, values: S) -> CompositeStream<S::Value>
    where
        S: ValueSource + 'static,
        S::Value: Clone,
    {
        let values = Arc::new(values);
        let prefix = self.config.value_prefix.clone();
        join(self.locations(), move |key: &Key| {
            ValueStream::open(values.clone(), ValueAddress::resolve(prefix.as_deref(), key))
        })
        .trace_snapshots(self.config.trace_snapshots)
    }

    /// Joined snapshots with JSON values decoded into `T`.
    pub fn typed<S, T>(
        &self,
        values: S,
    ) -> impl Stream<Item = std::result::Result<TypedSnapshot<T>, SourceError>>
    where
        S: ValueSource<Value = serde_json::Value> + 'static,
        T: DeserializeOwned,
    {
        self.typed_with(values, JsonDecoder::<T>::new())
    }

    /// Joined snapshots decoded with `decoder`.
    pub fn typed_with<S, D>(
        &self,
        values: S,
        decoder: D,
    ) -> impl Stream<Item = std::result::Result<TypedSnapshot<D::Output>, SourceError>>
    where
        S: ValueSource + 'static,
        S::Value: Clone,
        D: Decoder<S::Value>,
    {
        project(self.with_values(values), decoder)
    }

    /// Members with decodable values, flattened through `combiner` in key order.
    pub fn typed_list<S, D, C, U>(
        &self,
        values: S,
        decoder: D,
        combiner: C,
    ) -> impl Stream<Item = std::result::Result<Vec<U>, SourceError>>
    where
        S: ValueSource + 'static,
        S::Value: Clone,
        D: Decoder<S::Value>,
        C: FnMut(Key, Location, D::Output) -> U,
    {
        project_list(self.with_values(values), decoder, combiner)
    }
}
