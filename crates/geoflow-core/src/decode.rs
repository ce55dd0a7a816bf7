//! Typed decoding of secondary values
//!
//! A decoder is a pure per-item conversion. Failures are values, not errors:
//! the projection layer turns them into absent data.

use crate::errors::DecodeFailure;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::marker::PhantomData;

/// Converts a raw secondary value into a typed value.
pub trait Decoder<V>: Send + Sync {
    /// Decoded type
    type Output;

    /// Decode one value. Must not have side effects.
    fn decode(&self, raw: &V) -> Result<Self::Output, DecodeFailure>;
}

impl<V, T, F> Decoder<V> for F
where
    F: Fn(&V) -> Result<T, DecodeFailure> + Send + Sync,
{
    type Output = T;

    fn decode(&self, raw: &V) -> Result<T, DecodeFailure> {
        self(raw)
    }
}

/// Decodes JSON snapshot values into any deserializable type.
pub struct JsonDecoder<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    /// Decoder targeting `T`.
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDecoder")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned> Decoder<serde_json::Value> for JsonDecoder<T> {
    type Output = T;

    fn decode(&self, raw: &serde_json::Value) -> Result<T, DecodeFailure> {
        T::deserialize(raw).map_err(DecodeFailure::from)
    }
}
