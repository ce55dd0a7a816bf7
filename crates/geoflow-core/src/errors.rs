//! Error types for geoflow
//!
//! Three failure classes exist:
//! - [`SourceError`]: a membership or value source reported a terminal failure.
//!   Fatal to the whole subscription tree that observed it.
//! - [`DecodeFailure`]: a secondary value could not be converted to a typed
//!   value. Contained at the projection layer and never fatal.
//! - [`GeoflowError`]: configuration and validation failures outside of any
//!   running stream.
//!
//! Cancellation is not an error. Dropping a stream is the teardown signal.

use serde::{Deserialize, Serialize};

/// Terminal failure reported by an external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SourceError {
    /// The membership (location index) source failed
    #[error("Membership source failed: {message}")]
    Membership {
        /// Reason reported by the source
        message: String,
    },

    /// A value source failed for one address
    #[error("Value source failed at {address}: {message}")]
    Value {
        /// Address whose subscription failed
        address: String,
        /// Reason reported by the source
        message: String,
    },
}

impl SourceError {
    /// Create a membership source error
    pub fn membership(message: impl Into<String>) -> Self {
        Self::Membership {
            message: message.into(),
        }
    }

    /// Create a value source error for `address`
    pub fn value(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Value {
            address: address.into(),
            message: message.into(),
        }
    }

    /// The reason reported by the source.
    pub fn message(&self) -> &str {
        match self {
            Self::Membership { message } | Self::Value { message, .. } => message,
        }
    }
}

/// A secondary value that could not be decoded into the requested type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Decode failed: {message}")]
pub struct DecodeFailure {
    /// Error message describing why decoding failed
    pub message: String,
}

impl DecodeFailure {
    /// Create a decode failure
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for DecodeFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Error type for configuration and validation paths
#[derive(Debug, Clone, thiserror::Error)]
pub enum GeoflowError {
    /// Invalid input value
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },
}

impl GeoflowError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for GeoflowError {
    fn from(err: std::io::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<toml::de::Error> for GeoflowError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

/// Standard Result type for geoflow operations
pub type Result<T> = std::result::Result<T, GeoflowError>;
