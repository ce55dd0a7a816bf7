//! Small constructors and test logging setup

use geoflow_core::{Key, Location};
use std::sync::Once;

/// Location without range checks.
pub fn loc(latitude: f64, longitude: f64) -> Location {
    Location::new(latitude, longitude)
}

/// Member key.
pub fn key(raw: &str) -> Key {
    Key::from(raw)
}

static TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `geoflow=debug`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("geoflow=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
